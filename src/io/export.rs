use anyhow::Result;
use std::io::Write;

use crate::application::SplitService;
use crate::domain::{SettleScope, SettlementReport, TripId};

/// Exporter for converting trip data to various formats
pub struct Exporter<'a> {
    service: &'a SplitService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a SplitService) -> Self {
        Self { service }
    }

    /// Export a trip's active expenses to CSV format
    pub async fn export_expenses_csv<W: Write>(
        &self,
        trip_id: TripId,
        writer: W,
    ) -> Result<usize> {
        let expenses = self.service.list_expenses(trip_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id",
            "title",
            "category",
            "occurred_at",
            "total_amount",
            "currency",
            "settled",
        ])?;

        let mut count = 0;
        for expense in &expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                expense.title.clone(),
                expense.category.to_string(),
                expense.occurred_at.to_rfc3339(),
                expense.total_amount.to_string(),
                expense.currency.clone(),
                expense.settled.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export per-participant balances to CSV format
    pub async fn export_balances_csv<W: Write>(
        &self,
        trip_id: TripId,
        scope: SettleScope,
        writer: W,
    ) -> Result<usize> {
        let report = self.service.compute_settlement(trip_id, scope).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["participant_id", "name", "paid", "owed", "net"])?;

        let mut count = 0;
        for balance in &report.balances {
            csv_writer.write_record([
                balance.participant_id.to_string(),
                balance.name.clone(),
                balance.paid.to_string(),
                balance.owed.to_string(),
                balance.net.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export settlement transfers to CSV format
    pub async fn export_transfers_csv<W: Write>(
        &self,
        trip_id: TripId,
        scope: SettleScope,
        writer: W,
    ) -> Result<usize> {
        let report = self.service.compute_settlement(trip_id, scope).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["from_id", "from_name", "to_id", "to_name", "amount"])?;

        let mut count = 0;
        for transfer in &report.transfers {
            csv_writer.write_record([
                transfer.from_participant_id.to_string(),
                transfer.from_name.clone(),
                transfer.to_participant_id.to_string(),
                transfer.to_name.clone(),
                transfer.amount.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a full settlement report as JSON
    pub async fn export_settlement_json<W: Write>(
        &self,
        trip_id: TripId,
        scope: SettleScope,
        mut writer: W,
    ) -> Result<SettlementReport> {
        let report = self.service.compute_settlement(trip_id, scope).await?;

        let json = serde_json::to_string_pretty(&report)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(report)
    }
}
