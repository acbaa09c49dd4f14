use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{
    Expense, ExpenseCategory, ExpenseId, ExpenseLine, Participant, ParticipantId, Trip, TripId,
    TripSnapshot,
};

use super::MIGRATION_001_INITIAL;

// The schema stores flags as 'Y'/'N' text columns. Conversion to bool
// happens in the row mappers and nowhere else.
fn to_yn(flag: bool) -> &'static str {
    if flag { "Y" } else { "N" }
}

fn from_yn(value: &str) -> bool {
    value == "Y"
}

/// Repository for persisting and querying trips, participants, and expenses.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Trip operations
    // ========================

    /// Save a new trip and assign its row id.
    pub async fn save_trip(&self, trip: &mut Trip) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO trips (name, start_date, end_date, delete_yn, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trip.name)
        .bind(trip.start_date.to_string())
        .bind(trip.end_date.to_string())
        .bind(to_yn(!trip.active))
        .bind(trip.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save trip")?;

        trip.id = result.last_insert_rowid();
        Ok(())
    }

    /// Load a trip with its complete participant and expense graph.
    /// Soft-deleted rows are included; callers filter on the active flags.
    pub async fn load_trip(&self, id: TripId) -> Result<Option<TripSnapshot>> {
        let row = sqlx::query(
            "SELECT id, name, start_date, end_date, delete_yn, created_at FROM trips WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trip")?;

        let trip = match row {
            Some(row) => Self::row_to_trip(&row)?,
            None => return Ok(None),
        };

        let participants = self.load_participants(id).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, title, category, occurred_at, total_amount, currency,
                   delete_yn, settled_yn, settled_at, created_at
            FROM expenses
            WHERE trip_id = ?
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load expenses")?;

        let mut expenses = rows
            .iter()
            .map(Self::row_to_expense)
            .collect::<Result<Vec<_>>>()?;
        self.attach_lines(id, &mut expenses).await?;

        Ok(Some(TripSnapshot {
            trip,
            participants,
            expenses,
        }))
    }

    /// List active trips, most recently created first.
    pub async fn list_trips(&self) -> Result<Vec<Trip>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, start_date, end_date, delete_yn, created_at
            FROM trips
            WHERE delete_yn = 'N'
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list trips")?;

        rows.iter().map(Self::row_to_trip).collect()
    }

    /// Soft-delete a trip. Its participants and expenses are left untouched
    /// so the trip stays loadable by id.
    pub async fn soft_delete_trip(&self, id: TripId) -> Result<()> {
        sqlx::query("UPDATE trips SET delete_yn = 'Y' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete trip")?;
        Ok(())
    }

    /// Update a trip's date range.
    pub async fn update_trip_dates(
        &self,
        id: TripId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<()> {
        sqlx::query("UPDATE trips SET start_date = ?, end_date = ? WHERE id = ?")
            .bind(start_date.to_string())
            .bind(end_date.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update trip dates")?;
        Ok(())
    }

    fn row_to_trip(row: &sqlx::sqlite::SqliteRow) -> Result<Trip> {
        let start_date_str: String = row.get("start_date");
        let end_date_str: String = row.get("end_date");
        let delete_yn: String = row.get("delete_yn");
        let created_at_str: String = row.get("created_at");

        Ok(Trip {
            id: row.get("id"),
            name: row.get("name"),
            start_date: NaiveDate::parse_from_str(&start_date_str, "%Y-%m-%d")
                .context("Invalid start_date")?,
            end_date: NaiveDate::parse_from_str(&end_date_str, "%Y-%m-%d")
                .context("Invalid end_date")?,
            active: !from_yn(&delete_yn),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Participant operations
    // ========================

    /// Save a new participant and assign its row id.
    pub async fn save_participant(&self, participant: &mut Participant) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO participants (trip_id, name, phone, email, is_owner, delete_yn, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(participant.trip_id)
        .bind(&participant.name)
        .bind(&participant.phone)
        .bind(&participant.email)
        .bind(participant.is_owner)
        .bind(to_yn(!participant.active))
        .bind(participant.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save participant")?;

        participant.id = result.last_insert_rowid();
        Ok(())
    }

    /// Get a participant by id, soft-deleted or not.
    pub async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let row = sqlx::query(
            r#"
            SELECT id, trip_id, name, phone, email, is_owner, delete_yn, created_at
            FROM participants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch participant")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_participant(&row)?)),
            None => Ok(None),
        }
    }

    /// Soft-delete a participant. Their expense lines are left active.
    pub async fn soft_delete_participant(&self, id: ParticipantId) -> Result<()> {
        sqlx::query("UPDATE participants SET delete_yn = 'Y' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete participant")?;
        Ok(())
    }

    async fn load_participants(&self, trip_id: TripId) -> Result<Vec<Participant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, name, phone, email, is_owner, delete_yn, created_at
            FROM participants
            WHERE trip_id = ?
            ORDER BY id
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load participants")?;

        rows.iter().map(Self::row_to_participant).collect()
    }

    fn row_to_participant(row: &sqlx::sqlite::SqliteRow) -> Result<Participant> {
        let delete_yn: String = row.get("delete_yn");
        let created_at_str: String = row.get("created_at");

        Ok(Participant {
            id: row.get("id"),
            trip_id: row.get("trip_id"),
            name: row.get("name"),
            phone: row.get("phone"),
            email: row.get("email"),
            is_owner: row.get::<i32, _>("is_owner") != 0,
            active: !from_yn(&delete_yn),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Expense operations
    // ========================

    /// Save a new expense with its payment and share lines in one
    /// transaction, and assign its row id.
    pub async fn save_expense(&self, expense: &mut Expense) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO expenses (trip_id, title, category, occurred_at, total_amount, currency, delete_yn, settled_yn, settled_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.trip_id)
        .bind(&expense.title)
        .bind(expense.category.as_str())
        .bind(expense.occurred_at.to_rfc3339())
        .bind(expense.total_amount)
        .bind(&expense.currency)
        .bind(to_yn(!expense.active))
        .bind(to_yn(expense.settled))
        .bind(expense.settled_at.map(|dt| dt.to_rfc3339()))
        .bind(expense.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save expense")?;

        expense.id = result.last_insert_rowid();

        Self::insert_lines(&mut tx, "expense_payments", expense.id, &expense.payments).await?;
        Self::insert_lines(&mut tx, "expense_shares", expense.id, &expense.shares).await?;

        tx.commit().await.context("Failed to commit expense")?;
        Ok(())
    }

    /// Get an expense with all its lines, soft-deleted or not.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(
            r#"
            SELECT id, trip_id, title, category, occurred_at, total_amount, currency,
                   delete_yn, settled_yn, settled_at, created_at
            FROM expenses
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch expense")?;

        let mut expense = match row {
            Some(row) => Self::row_to_expense(&row)?,
            None => return Ok(None),
        };

        expense.payments = self.load_lines_for_expense("expense_payments", id).await?;
        expense.shares = self.load_lines_for_expense("expense_shares", id).await?;
        Ok(Some(expense))
    }

    /// Update an expense's details and swap its lines: existing lines are
    /// retired, the given ones inserted fresh. Runs in one transaction.
    pub async fn replace_expense(&self, expense: &Expense) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            UPDATE expenses
            SET title = ?, category = ?, occurred_at = ?, total_amount = ?, currency = ?
            WHERE id = ?
            "#,
        )
        .bind(&expense.title)
        .bind(expense.category.as_str())
        .bind(expense.occurred_at.to_rfc3339())
        .bind(expense.total_amount)
        .bind(&expense.currency)
        .bind(expense.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update expense")?;

        for table in ["expense_payments", "expense_shares"] {
            let query = format!("UPDATE {} SET delete_yn = 'Y' WHERE expense_id = ?", table);
            sqlx::query(&query)
                .bind(expense.id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to retire lines in {}", table))?;
        }

        Self::insert_lines(&mut tx, "expense_payments", expense.id, &expense.payments).await?;
        Self::insert_lines(&mut tx, "expense_shares", expense.id, &expense.shares).await?;

        tx.commit().await.context("Failed to commit expense update")?;
        Ok(())
    }

    /// Soft-delete an expense and all its lines in one transaction.
    pub async fn soft_delete_expense(&self, id: ExpenseId) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("UPDATE expenses SET delete_yn = 'Y' WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete expense")?;

        for table in ["expense_payments", "expense_shares"] {
            let query = format!("UPDATE {} SET delete_yn = 'Y' WHERE expense_id = ?", table);
            sqlx::query(&query)
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete lines in {}", table))?;
        }

        tx.commit().await.context("Failed to commit expense delete")?;
        Ok(())
    }

    /// Set or clear an expense's settled state.
    pub async fn update_expense_settled(
        &self,
        id: ExpenseId,
        settled: bool,
        settled_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query("UPDATE expenses SET settled_yn = ?, settled_at = ? WHERE id = ?")
            .bind(to_yn(settled))
            .bind(settled_at.map(|dt| dt.to_rfc3339()))
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update expense settled state")?;
        Ok(())
    }

    /// List a trip's active expenses, most recent first, with lines attached.
    pub async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, title, category, occurred_at, total_amount, currency,
                   delete_yn, settled_yn, settled_at, created_at
            FROM expenses
            WHERE trip_id = ? AND delete_yn = 'N'
            ORDER BY occurred_at DESC, id DESC
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        let mut expenses = rows
            .iter()
            .map(Self::row_to_expense)
            .collect::<Result<Vec<_>>>()?;
        self.attach_lines(trip_id, &mut expenses).await?;

        Ok(expenses)
    }

    async fn insert_lines(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        table: &str,
        expense_id: ExpenseId,
        lines: &[ExpenseLine],
    ) -> Result<()> {
        let query = format!(
            "INSERT INTO {} (expense_id, participant_id, amount, delete_yn) VALUES (?, ?, ?, ?)",
            table
        );

        for line in lines {
            sqlx::query(&query)
                .bind(expense_id)
                .bind(line.participant_id)
                .bind(line.amount)
                .bind(to_yn(!line.active))
                .execute(&mut **tx)
                .await
                .with_context(|| format!("Failed to insert line into {}", table))?;
        }
        Ok(())
    }

    async fn load_lines_for_expense(
        &self,
        table: &str,
        expense_id: ExpenseId,
    ) -> Result<Vec<ExpenseLine>> {
        let query = format!(
            "SELECT participant_id, amount, delete_yn FROM {} WHERE expense_id = ? ORDER BY id",
            table
        );

        let rows = sqlx::query(&query)
            .bind(expense_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to load lines from {}", table))?;

        rows.iter().map(Self::row_to_line).collect()
    }

    /// Load every line for a trip's expenses in one query per table,
    /// bucketed by expense id.
    async fn load_lines_for_trip(
        &self,
        table: &str,
        trip_id: TripId,
    ) -> Result<HashMap<ExpenseId, Vec<ExpenseLine>>> {
        let query = format!(
            r#"
            SELECT expense_id, participant_id, amount, delete_yn
            FROM {}
            WHERE expense_id IN (SELECT id FROM expenses WHERE trip_id = ?)
            ORDER BY id
            "#,
            table
        );

        let rows = sqlx::query(&query)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to load lines from {}", table))?;

        let mut lines: HashMap<ExpenseId, Vec<ExpenseLine>> = HashMap::new();
        for row in &rows {
            let expense_id: ExpenseId = row.get("expense_id");
            lines
                .entry(expense_id)
                .or_default()
                .push(Self::row_to_line(row)?);
        }
        Ok(lines)
    }

    async fn attach_lines(&self, trip_id: TripId, expenses: &mut [Expense]) -> Result<()> {
        let mut payments = self.load_lines_for_trip("expense_payments", trip_id).await?;
        let mut shares = self.load_lines_for_trip("expense_shares", trip_id).await?;

        for expense in expenses {
            expense.payments = payments.remove(&expense.id).unwrap_or_default();
            expense.shares = shares.remove(&expense.id).unwrap_or_default();
        }
        Ok(())
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let category_str: String = row.get("category");
        let occurred_at_str: String = row.get("occurred_at");
        let delete_yn: String = row.get("delete_yn");
        let settled_yn: String = row.get("settled_yn");
        let settled_at_str: Option<String> = row.get("settled_at");
        let created_at_str: String = row.get("created_at");

        Ok(Expense {
            id: row.get("id"),
            trip_id: row.get("trip_id"),
            title: row.get("title"),
            category: ExpenseCategory::from_str(&category_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid expense category: {}", category_str))?,
            occurred_at: DateTime::parse_from_rfc3339(&occurred_at_str)
                .context("Invalid occurred_at timestamp")?
                .with_timezone(&Utc),
            total_amount: row.get("total_amount"),
            currency: row.get("currency"),
            active: !from_yn(&delete_yn),
            settled: from_yn(&settled_yn),
            settled_at: settled_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid settled_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            payments: Vec::new(),
            shares: Vec::new(),
        })
    }

    fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<ExpenseLine> {
        let delete_yn: String = row.get("delete_yn");

        Ok(ExpenseLine {
            participant_id: row.get("participant_id"),
            amount: row.get("amount"),
            active: !from_yn(&delete_yn),
        })
    }
}
