use serde::{Deserialize, Serialize};

use crate::domain::{Amount, ExpenseCategory, TripId, TripSnapshot};

/// Spending breakdown for one trip, over its active expenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripStatistics {
    pub trip_id: TripId,
    pub trip_name: String,
    pub total_expense: Amount,
    pub categories: Vec<CategoryStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: ExpenseCategory,
    pub total: Amount,
    pub count: i64,
    /// Share of total spend, rounded to one decimal.
    pub percentage: f64,
}

/// Build the per-category spending breakdown. Settled expenses still count;
/// only soft-deleted ones are excluded. Categories with no spend are omitted
/// and the rest are sorted by total, largest first.
pub fn build_trip_statistics(snapshot: &TripSnapshot) -> TripStatistics {
    let mut total_expense: Amount = 0;
    let mut totals = [0_i64; ExpenseCategory::ALL.len()];
    let mut counts = [0_i64; ExpenseCategory::ALL.len()];

    for expense in snapshot.expenses.iter().filter(|e| e.active) {
        total_expense += expense.total_amount;
        let idx = ExpenseCategory::ALL
            .iter()
            .position(|c| *c == expense.category)
            .unwrap_or(ExpenseCategory::ALL.len() - 1);
        totals[idx] += expense.total_amount;
        counts[idx] += 1;
    }

    let mut categories: Vec<CategoryStat> = ExpenseCategory::ALL
        .iter()
        .enumerate()
        .filter(|(i, _)| totals[*i] > 0)
        .map(|(i, category)| CategoryStat {
            category: *category,
            total: totals[i],
            count: counts[i],
            percentage: (totals[i] as f64 * 100.0 / total_expense as f64 * 10.0).round() / 10.0,
        })
        .collect();

    categories.sort_by(|a, b| b.total.cmp(&a.total));

    TripStatistics {
        trip_id: snapshot.trip.id,
        trip_name: snapshot.trip.name.clone(),
        total_expense,
        categories,
    }
}
