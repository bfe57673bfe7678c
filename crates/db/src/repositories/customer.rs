use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use paintvox_core::domain::customer::{best_match, name_tokens, Customer, CustomerId};

use super::{CustomerDirectory, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerDirectory {
    pool: DbPool,
}

impl SqlCustomerDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerDirectory for SqlCustomerDirectory {
    async fn find_by_name(&self, query: &str) -> Result<Option<Customer>, RepositoryError> {
        let tokens = name_tokens(query);
        if tokens.is_empty() {
            return Ok(None);
        }

        // Narrow to rows sharing at least one token, then rank in memory.
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, address, phone, email FROM customer WHERE ",
        );
        let mut clauses = builder.separated(" OR ");
        for token in &tokens {
            clauses.push("name_normalized LIKE ");
            clauses.push_bind_unseparated(format!("%{token}%"));
        }
        builder.push(" ORDER BY created_at, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let candidates = rows.iter().map(customer_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(best_match(query, &candidates).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO customer (id, name, name_normalized, address, phone, email, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                name_normalized = excluded.name_normalized,
                address = excluded.address,
                phone = excluded.phone,
                email = excluded.email
            "#,
        )
        .bind(customer.id.0.to_string())
        .bind(&customer.name)
        .bind(name_tokens(&customer.name).join(" "))
        .bind(customer.address.as_deref())
        .bind(customer.phone.as_deref())
        .bind(customer.email.as_deref())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let raw_id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&raw_id)
        .map_err(|error| RepositoryError::Decode(format!("invalid customer id `{raw_id}`: {error}")))?;

    Ok(Customer {
        id: CustomerId(id),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
    })
}
