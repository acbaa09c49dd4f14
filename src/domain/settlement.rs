use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Amount, Expense, Participant, ParticipantId, SettleScope, TripSnapshot};

/// The result of one settlement run: total spend in scope, per-participant
/// balances, and the transfers that zero them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub total_expense: Amount,
    pub balances: Vec<ParticipantBalance>,
    pub transfers: Vec<Transfer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantBalance {
    pub participant_id: ParticipantId,
    pub name: String,
    /// Total this participant fronted across in-scope expenses.
    pub paid: Amount,
    /// Total of this participant's shares across in-scope expenses.
    pub owed: Amount,
    /// paid - owed. Positive: the group owes them. Negative: they owe the group.
    pub net: Amount,
}

/// A recommended repayment from one participant to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_participant_id: ParticipantId,
    pub from_name: String,
    pub to_participant_id: ParticipantId,
    pub to_name: String,
    pub amount: Amount,
}

/// Compute a settlement over a trip snapshot. Pure function: the snapshot is
/// never mutated, and two calls over the same snapshot return the same report.
///
/// Active participants are kept in snapshot order. Expenses are filtered to
/// active ones, and under [`SettleScope::Unsettled`] additionally to those not
/// yet marked settled. Ledger inconsistencies (sum mismatches, lines held by
/// soft-deleted participants) are logged at warn level and the best-effort
/// report is returned anyway.
pub fn settle(snapshot: &TripSnapshot, scope: SettleScope) -> SettlementReport {
    let participants: Vec<&Participant> = snapshot.participants.iter().filter(|p| p.active).collect();

    let expenses: Vec<&Expense> = snapshot
        .expenses
        .iter()
        .filter(|e| e.active && (scope == SettleScope::All || !e.settled))
        .collect();

    let total_expense = expenses.iter().map(|e| e.total_amount).sum();
    let balances = aggregate_balances(&participants, &expenses);
    let transfers = resolve_transfers(&balances);

    SettlementReport {
        total_expense,
        balances,
        transfers,
    }
}

/// Sum paid and owed per active participant. A payment or share line that
/// references a participant outside the active set is dropped, not
/// reassigned; the resulting drift is reported by the aggregate check below.
fn aggregate_balances(
    participants: &[&Participant],
    expenses: &[&Expense],
) -> Vec<ParticipantBalance> {
    let mut paid: HashMap<ParticipantId, Amount> =
        participants.iter().map(|p| (p.id, 0)).collect();
    let mut owed: HashMap<ParticipantId, Amount> =
        participants.iter().map(|p| (p.id, 0)).collect();

    for expense in expenses {
        let mut payment_sum = 0;
        for line in expense.active_payments() {
            payment_sum += line.amount;
            if let Some(total) = paid.get_mut(&line.participant_id) {
                *total += line.amount;
            }
        }

        let mut share_sum = 0;
        for line in expense.active_shares() {
            share_sum += line.amount;
            if let Some(total) = owed.get_mut(&line.participant_id) {
                *total += line.amount;
            }
        }

        if payment_sum != expense.total_amount || share_sum != expense.total_amount {
            tracing::warn!(
                expense_id = expense.id,
                total = expense.total_amount,
                payments = payment_sum,
                shares = share_sum,
                "expense line sums do not match its total"
            );
        }
    }

    let balances: Vec<ParticipantBalance> = participants
        .iter()
        .map(|p| {
            let paid_total = paid.get(&p.id).copied().unwrap_or(0);
            let owed_total = owed.get(&p.id).copied().unwrap_or(0);
            ParticipantBalance {
                participant_id: p.id,
                name: p.name.clone(),
                paid: paid_total,
                owed: owed_total,
                net: paid_total - owed_total,
            }
        })
        .collect();

    let drift: Amount = balances.iter().map(|b| b.net).sum();
    if drift != 0 {
        tracing::warn!(
            drift,
            "net balances do not sum to zero; a removed participant likely still holds expense lines"
        );
    }

    balances
}

/// Heap entry for the greedy matcher.
#[derive(Debug, Clone)]
struct BalanceNode {
    /// Remaining amount still to match, always positive.
    remaining: Amount,
    participant_id: ParticipantId,
    name: String,
}

impl PartialEq for BalanceNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BalanceNode {}

impl PartialOrd for BalanceNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BalanceNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Largest remaining amount first. BinaryHeap is a max-heap, so this is
        // correct; among equal amounts the lower participant id wins, which
        // keeps runs deterministic.
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.participant_id.cmp(&self.participant_id))
    }
}

/// Match creditors (net > 0) against debtors (net < 0), always pairing the
/// largest remaining credit with the largest remaining debt. Produces at most
/// N-1 transfers for N nonzero balances, though not necessarily the absolute
/// minimum count.
fn resolve_transfers(balances: &[ParticipantBalance]) -> Vec<Transfer> {
    let mut creditors: BinaryHeap<BalanceNode> = balances
        .iter()
        .filter(|b| b.net > 0)
        .map(|b| BalanceNode {
            remaining: b.net,
            participant_id: b.participant_id,
            name: b.name.clone(),
        })
        .collect();

    let mut debtors: BinaryHeap<BalanceNode> = balances
        .iter()
        .filter(|b| b.net < 0)
        .map(|b| BalanceNode {
            remaining: -b.net,
            participant_id: b.participant_id,
            name: b.name.clone(),
        })
        .collect();

    let mut transfers = Vec::new();

    while let (Some(mut creditor), Some(mut debtor)) = (creditors.pop(), debtors.pop()) {
        let amount = creditor.remaining.min(debtor.remaining);

        transfers.push(Transfer {
            from_participant_id: debtor.participant_id,
            from_name: debtor.name.clone(),
            to_participant_id: creditor.participant_id,
            to_name: creditor.name.clone(),
            amount,
        });

        creditor.remaining -= amount;
        debtor.remaining -= amount;

        if creditor.remaining > 0 {
            creditors.push(creditor);
        }
        if debtor.remaining > 0 {
            debtors.push(debtor);
        }
    }

    transfers
}
