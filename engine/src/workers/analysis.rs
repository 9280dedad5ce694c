//! Analysis Worker
//!
//! Answers a natural-language question about the working dataset. The
//! dataset is loaded into an in-memory SQLite table, the LLM translates the
//! question into a single read-only SQL statement, and the first row of the
//! result is returned.

use async_trait::async_trait;
use serde_json::json;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::llm::{extract_fenced_block, LLMProvider, Message, ResponseFormat};
use sdk::errors::CapabilityError;
use sdk::{Artifact, Capability, CapabilityDescriptor, CellValue, ContextSlot, Dataset, Invocation};

pub const NAME: &str = "DataAnalysisAgent";

/// Rows shown to the LLM alongside the schema
const SAMPLE_ROWS: usize = 3;

pub struct AnalysisWorker {
    descriptor: CapabilityDescriptor,
    llm: Arc<dyn LLMProvider>,
    table_name: String,
}

impl AnalysisWorker {
    pub fn new(llm: Arc<dyn LLMProvider>, config: &AnalysisConfig) -> Self {
        let descriptor =
            CapabilityDescriptor::new(NAME, "Answers a specific question about a data table.")
                .requires_goal()
                .reads(ContextSlot::Dataset)
                .writes(ContextSlot::Answer)
                .caller_visible()
                .example(json!({
                    "agent": NAME,
                    "goal": "How many films grossed more than $2 billion before 2020?"
                }));

        Self {
            descriptor,
            llm,
            table_name: config.table_name.clone(),
        }
    }

    /// Answer `question` against `dataset`
    pub async fn answer(&self, dataset: &Dataset, question: &str) -> Result<Artifact, CapabilityError> {
        if question.trim().is_empty() {
            return Err(CapabilityError::MissingParameter("goal".to_string()));
        }
        if dataset.is_empty() {
            info!("Dataset is empty; nothing to analyze");
            return Ok(Artifact::Empty);
        }

        let sql = self.generate_sql(dataset, question).await?;
        info!("Generated SQL -> {}", sql);

        let row = run_query(dataset, &self.table_name, &sql).await?;
        Ok(match row {
            None => Artifact::Empty,
            Some(mut fields) if fields.len() == 1 => {
                let (_, value) = fields.remove(0);
                Artifact::Value(value)
            }
            Some(fields) => Artifact::Record(fields),
        })
    }

    async fn generate_sql(&self, dataset: &Dataset, question: &str) -> Result<String, CapabilityError> {
        let system = format!(
            "You are an expert SQLite SQL writer. Your ONLY job is to convert the user's question \
             into a valid SQLite SQL query.\n\
             The data is in a table named `{table}`. The schema is:\n{schema}\n\n\
             Rules:\n\
             1.  Respond with ONLY the SQL query. Do not add any explanation or other text.\n\
             2.  Use double quotes for column names with special characters (e.g., \"Worldwide gross\").\n\
             3.  To use monetary strings (e.g., '$2,123,456') in calculations, first clean them by \
             removing '$' and ',' with REPLACE and then CAST to a numeric type.\n\
             4.  Write a single read-only SELECT statement.",
            table = self.table_name,
            schema = describe_schema(dataset),
        );

        let messages = [Message::system(system), Message::user(question)];
        let content = self
            .llm
            .generate(&messages, ResponseFormat::Text)
            .await
            .map_err(|e| CapabilityError::Generation(e.to_string()))?;

        sanitize_query(&content)
    }
}

#[async_trait]
impl Capability for AnalysisWorker {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, invocation: Invocation<'_>) -> Result<Artifact, CapabilityError> {
        let dataset = invocation.dataset(ContextSlot::Dataset)?;
        self.answer(dataset, invocation.goal()).await
    }
}

/// Column listing in the style of `PRAGMA table_info`, plus a few sample rows
pub fn describe_schema(dataset: &Dataset) -> String {
    let mut lines = vec!["cid | name | type".to_string()];
    for (cid, name) in dataset.columns().iter().enumerate() {
        lines.push(format!("{} | {} | {}", cid, name, column_affinity(dataset, cid)));
    }

    if !dataset.is_empty() {
        lines.push(String::new());
        lines.push("Sample rows:".to_string());
        for row in dataset.rows().iter().take(SAMPLE_ROWS) {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            lines.push(cells.join(" | "));
        }
    }

    lines.join("\n")
}

/// Reduce an LLM reply to one read-only statement
pub fn sanitize_query(content: &str) -> Result<String, CapabilityError> {
    let body = extract_fenced_block(content).unwrap_or(content);
    let sql = body
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    if sql.is_empty() {
        return Err(CapabilityError::QueryError("generated query is empty".to_string()));
    }
    if has_trailing_statement(sql) {
        return Err(CapabilityError::QueryError(
            "generated query contains more than one statement".to_string(),
        ));
    }

    let keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if keyword != "select" && keyword != "with" {
        return Err(CapabilityError::QueryError(format!(
            "only SELECT queries are allowed, got: {}",
            sql
        )));
    }

    Ok(sql.to_string())
}

/// Whether a `;` outside quotes is followed by more SQL
fn has_trailing_statement(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for (i, c) in sql.char_indices() {
        match (quote, c) {
            // A doubled quote inside a literal toggles out and straight back in
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, ';') => {
                if sql[i + 1..].chars().any(|r| !r.is_whitespace() && r != ';') {
                    return true;
                }
            }
            (None, _) => {}
        }
    }
    false
}

/// Load `dataset` into a fresh in-memory table and return the query's first row
pub async fn run_query(
    dataset: &Dataset,
    table_name: &str,
    sql: &str,
) -> Result<Option<Vec<(String, CellValue)>>, CapabilityError> {
    let mut conn = SqliteConnection::connect("sqlite::memory:")
        .await
        .map_err(query_error)?;

    load_dataset(&mut conn, dataset, table_name).await?;

    let row = sqlx::query(sql)
        .fetch_optional(&mut conn)
        .await
        .map_err(query_error)?;

    let result = row.map(|row| decode_row(&row)).transpose()?;

    if let Err(e) = conn.close().await {
        debug!("Closing analysis connection failed: {}", e);
    }
    Ok(result)
}

async fn load_dataset(
    conn: &mut SqliteConnection,
    dataset: &Dataset,
    table_name: &str,
) -> Result<(), CapabilityError> {
    let column_defs: Vec<String> = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} {}", quote_ident(name), column_affinity(dataset, i)))
        .collect();
    let create = format!(
        "CREATE TABLE {} ({})",
        quote_ident(table_name),
        column_defs.join(", ")
    );
    sqlx::query(&create)
        .execute(&mut *conn)
        .await
        .map_err(query_error)?;

    let placeholders = vec!["?"; dataset.num_columns()].join(", ");
    let insert = format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(table_name),
        placeholders
    );

    let mut tx = conn.begin().await.map_err(query_error)?;
    for row in dataset.rows() {
        let mut query = sqlx::query(&insert);
        for cell in row {
            query = match cell {
                CellValue::Null => query.bind(None::<i64>),
                CellValue::Bool(b) => query.bind(*b),
                CellValue::Integer(i) => query.bind(*i),
                CellValue::Float(f) => query.bind(*f),
                CellValue::Text(s) => query.bind(s.clone()),
            };
        }
        query.execute(&mut *tx).await.map_err(query_error)?;
    }
    tx.commit().await.map_err(query_error)?;

    debug!(
        "Loaded {} rows into '{}'",
        dataset.num_rows(),
        table_name
    );
    Ok(())
}

fn decode_row(row: &SqliteRow) -> Result<Vec<(String, CellValue)>, CapabilityError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let raw = row.try_get_raw(i).map_err(query_error)?;
            let value = if raw.is_null() {
                CellValue::Null
            } else {
                let type_name = raw.type_info().name().to_ascii_uppercase();
                match type_name.as_str() {
                    "INTEGER" => CellValue::Integer(row.try_get(i).map_err(query_error)?),
                    "REAL" => CellValue::Float(row.try_get(i).map_err(query_error)?),
                    "BLOB" => {
                        let bytes: Vec<u8> = row.try_get(i).map_err(query_error)?;
                        CellValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                    }
                    _ => CellValue::Text(row.try_get(i).map_err(query_error)?),
                }
            };
            Ok((column.name().to_string(), value))
        })
        .collect()
}

/// SQLite type affinity for a column, from its non-null cells
fn column_affinity(dataset: &Dataset, index: usize) -> &'static str {
    let mut saw_value = false;
    let mut all_integer = true;
    let mut all_numeric = true;

    for cell in dataset.rows().iter().map(|row| &row[index]) {
        match cell {
            CellValue::Null => continue,
            CellValue::Integer(_) | CellValue::Bool(_) => {}
            CellValue::Float(_) => all_integer = false,
            CellValue::Text(_) => {
                all_integer = false;
                all_numeric = false;
            }
        }
        saw_value = true;
    }

    match (saw_value, all_integer, all_numeric) {
        (false, _, _) => "TEXT",
        (true, true, _) => "INTEGER",
        (true, false, true) => "REAL",
        _ => "TEXT",
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn query_error(e: sqlx::Error) -> CapabilityError {
    CapabilityError::QueryError(e.to_string())
}
