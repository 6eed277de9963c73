use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use evaka_finance_core::domain::decision::{
    DecisionId, DecisionKind, DecisionStatus, FinanceDecision,
};
use evaka_finance_core::domain::person::PersonId;

use super::{DecisionRepository, RepositoryError};
use crate::DbPool;

/// Decision storage for both decision kinds. Each kind lives in its own table;
/// the whole decision is kept as a JSON document next to the columns it is
/// queried by.
pub struct SqlDecisionRepository {
    pool: DbPool,
}

impl SqlDecisionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn table_name(kind: DecisionKind) -> &'static str {
    match kind {
        DecisionKind::Fee => "fee_decision",
        DecisionKind::VoucherValue => "voucher_value_decision",
    }
}

struct DecisionRecord {
    id: String,
    head_of_family_id: String,
    status: &'static str,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
    document: String,
}

impl DecisionRecord {
    fn from_decision<D>(decision: &D) -> Result<Self, RepositoryError>
    where
        D: FinanceDecision + Serialize,
    {
        let validity = decision.validity();
        Ok(Self {
            id: decision.id().0.to_string(),
            head_of_family_id: decision.head_of_family().0.to_string(),
            status: decision.status().as_str(),
            valid_from: validity.start(),
            valid_to: validity.end(),
            document: serde_json::to_string(decision)
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        })
    }
}

fn row_to_decision<D: DeserializeOwned>(row: &SqliteRow) -> Result<D, RepositoryError> {
    let document: String =
        row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    serde_json::from_str(&document).map_err(|e| RepositoryError::Decode(e.to_string()))
}

async fn upsert(
    conn: &mut SqliteConnection,
    kind: DecisionKind,
    record: &DecisionRecord,
) -> Result<(), RepositoryError> {
    let sql = format!(
        "INSERT INTO {table}
            (id, head_of_family_id, status, valid_from, valid_to, document, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            head_of_family_id = excluded.head_of_family_id,
            status = excluded.status,
            valid_from = excluded.valid_from,
            valid_to = excluded.valid_to,
            document = excluded.document,
            updated_at = excluded.updated_at",
        table = table_name(kind)
    );

    sqlx::query(&sql)
        .bind(&record.id)
        .bind(&record.head_of_family_id)
        .bind(record.status)
        .bind(record.valid_from)
        .bind(record.valid_to)
        .bind(&record.document)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl<D> DecisionRepository<D> for SqlDecisionRepository
where
    D: FinanceDecision + Serialize + DeserializeOwned,
{
    async fn find_by_id(&self, id: &DecisionId) -> Result<Option<D>, RepositoryError> {
        let sql = format!("SELECT document FROM {} WHERE id = ?", table_name(D::KIND));
        let row = sqlx::query(&sql).bind(id.0.to_string()).fetch_optional(&self.pool).await?;

        row.as_ref().map(row_to_decision::<D>).transpose()
    }

    async fn find_for_head_of_family(
        &self,
        head_of_family: PersonId,
        statuses: &[DecisionStatus],
    ) -> Result<Vec<D>, RepositoryError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT document FROM {}
             WHERE head_of_family_id = ? AND status IN ({placeholders})
             ORDER BY valid_from ASC, id ASC",
            table_name(D::KIND)
        );

        let mut query = sqlx::query(&sql).bind(head_of_family.0.to_string());
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(row_to_decision::<D>).collect()
    }

    async fn save(&self, decision: D) -> Result<(), RepositoryError> {
        let record = DecisionRecord::from_decision(&decision)?;
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, D::KIND, &record).await
    }

    async fn replace_drafts(
        &self,
        head_of_family: PersonId,
        decisions: Vec<D>,
    ) -> Result<(), RepositoryError> {
        let records = decisions
            .iter()
            .map(DecisionRecord::from_decision)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;

        let delete = format!(
            "DELETE FROM {} WHERE head_of_family_id = ? AND status = ?",
            table_name(D::KIND)
        );
        sqlx::query(&delete)
            .bind(head_of_family.0.to_string())
            .bind(DecisionStatus::Draft.as_str())
            .execute(&mut *tx)
            .await?;

        for record in &records {
            upsert(&mut tx, D::KIND, record).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
