//! Database executor trait and model CRUD operations.
//!
//! [`DbExecutor`] is the minimal async interface the model layer needs. It is
//! implemented by [`SqliteBackend`](crate::sqlite::SqliteBackend) and by its
//! [`Transaction`](crate::sqlite::Transaction), so every CRUD function here
//! works the same inside and outside a transaction.

use crate::model::Model;
use crate::value::{Row, Value};
use nextgisweb_core::{NgwError, NgwResult};

/// Minimal async database executor.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Runs a statement that does not return rows. Returns rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> NgwResult<u64>;

    /// Runs a query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> NgwResult<Vec<Row>>;

    /// Runs an INSERT and returns the id of the inserted row.
    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> NgwResult<i64>;

    /// Runs a query and returns exactly one row.
    ///
    /// Returns `DoesNotExist` if no rows, `MultipleObjectsReturned` if more
    /// than one.
    async fn query_one(&self, sql: &str, params: &[Value]) -> NgwResult<Row> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            0 => Err(NgwError::DoesNotExist("No rows returned".to_string())),
            1 => Ok(rows.remove(0)),
            n => Err(NgwError::MultipleObjectsReturned(format!(
                "Expected 1 row, got {n}"
            ))),
        }
    }
}

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inserts a record.
///
/// A record without primary key gets the database-assigned id; a record
/// with a primary key (joined subtype rows) is inserted with that id.
pub async fn insert_model<M: Model>(model: &mut M, db: &dyn DbExecutor) -> NgwResult<()> {
    let mut fields = model.field_values();
    if let Some(pk) = model.pk() {
        fields.insert(0, (M::pk_field_name(), Value::Int(pk)));
    }

    let names: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
    let params: Vec<Value> = fields.into_iter().map(|(_, v)| v).collect();
    let sql = if names.is_empty() {
        format!("INSERT INTO \"{}\" DEFAULT VALUES", M::table_name())
    } else {
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({placeholders})",
            M::table_name(),
            quoted(&names)
        )
    };

    let id = db.insert_returning_id(&sql, &params).await?;
    if model.pk().is_none() {
        model.set_pk(id);
    }
    tracing::trace!(table = M::table_name(), id, "Inserted row");
    Ok(())
}

/// Updates all non-pk columns of a saved record.
pub async fn update_model<M: Model>(model: &M, db: &dyn DbExecutor) -> NgwResult<()> {
    let pk = model.pk().ok_or_else(|| {
        NgwError::DatabaseError(format!(
            "Cannot update unsaved '{}' record",
            M::table_name()
        ))
    })?;

    let fields = model.field_values();
    if fields.is_empty() {
        return Ok(());
    }

    let assignments = fields
        .iter()
        .map(|(n, _)| format!("\"{n}\" = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut params: Vec<Value> = fields.into_iter().map(|(_, v)| v).collect();
    params.push(Value::Int(pk));

    let sql = format!(
        "UPDATE \"{}\" SET {assignments} WHERE \"{}\" = ?",
        M::table_name(),
        M::pk_field_name()
    );
    let affected = db.execute_sql(&sql, &params).await?;
    if affected == 0 {
        return Err(NgwError::DoesNotExist(format!(
            "'{}' with {} {pk} does not exist",
            M::table_name(),
            M::pk_field_name()
        )));
    }
    Ok(())
}

/// Deletes a record by its primary key. Deleting an unsaved record is a
/// no-op.
pub async fn delete_model<M: Model>(model: &M, db: &dyn DbExecutor) -> NgwResult<()> {
    let Some(pk) = model.pk() else {
        return Ok(());
    };
    let sql = format!(
        "DELETE FROM \"{}\" WHERE \"{}\" = ?",
        M::table_name(),
        M::pk_field_name()
    );
    db.execute_sql(&sql, &[Value::Int(pk)]).await?;
    Ok(())
}

/// Loads a record by primary key.
pub async fn get_model<M: Model>(db: &dyn DbExecutor, pk: i64) -> NgwResult<M> {
    let sql = format!(
        "SELECT {} FROM \"{}\" WHERE \"{}\" = ?",
        quoted(&M::meta().column_names()),
        M::table_name(),
        M::pk_field_name()
    );
    let row = db
        .query_one(&sql, &[Value::Int(pk)])
        .await
        .map_err(|e| match e {
            NgwError::DoesNotExist(_) => NgwError::DoesNotExist(format!(
                "'{}' with {} {pk} does not exist",
                M::table_name(),
                M::pk_field_name()
            )),
            other => other,
        })?;
    M::from_row(&row)
}

/// Loads records matching a WHERE fragment (`"layer_id" = ?`), ordered by
/// an ORDER BY fragment.
pub async fn select_models<M: Model>(
    db: &dyn DbExecutor,
    where_sql: &str,
    params: &[Value],
    order_by: &str,
) -> NgwResult<Vec<M>> {
    let mut sql = format!(
        "SELECT {} FROM \"{}\"",
        quoted(&M::meta().column_names()),
        M::table_name()
    );
    if !where_sql.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_sql);
    }
    if !order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }
    db.query(&sql, params)
        .await?
        .iter()
        .map(M::from_row)
        .collect()
}
