//! In-memory `Executor` for integration tests. Understands exactly the statement shapes the
//! SQL builder emits and records every statement it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use crudgen::config::{EntityConfig, ValidationRule};
use crudgen::sql::QueryBuf;
use crudgen::{resolve, EntityDescriptor, Executor, Record};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Record>>,
    next_id: HashMap<String, i64>,
    clock: i64,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    log: Mutex<Vec<QueryBuf>>,
    /// Affected or matched row count of the last statement.
    last_count: Mutex<Option<u64>>,
    fail: AtomicBool,
    select_all: Regex,
    select_one: Regex,
    insert: Regex,
    update: Regex,
    delete: Regex,
    assignment: Regex,
    column: Regex,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            log: Mutex::new(Vec::new()),
            last_count: Mutex::new(None),
            fail: AtomicBool::new(false),
            select_all: Regex::new(r#"^SELECT \* FROM "(\w+)" ORDER BY "created_at" DESC, "id" DESC$"#).unwrap(),
            select_one: Regex::new(r#"^SELECT \* FROM "(\w+)" WHERE "id" = \$1$"#).unwrap(),
            insert: Regex::new(r#"^INSERT INTO "(\w+)" \(([^)]*)\) VALUES \(([^)]*)\) RETURNING \*$"#).unwrap(),
            update: Regex::new(r#"^UPDATE "(\w+)" SET (.+) WHERE "id" = \$1 RETURNING \*$"#).unwrap(),
            delete: Regex::new(r#"^DELETE FROM "(\w+)" WHERE "id" = \$1$"#).unwrap(),
            assignment: Regex::new(r#"^"(\w+)" = \$(\d+)$"#).unwrap(),
            column: Regex::new(r#"^"(\w+)"$"#).unwrap(),
        }
    }

    /// Make every following statement fail with a store fault.
    pub fn fail_next_statements(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn statements(&self) -> Vec<QueryBuf> {
        self.log.lock().unwrap().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn last_count(&self) -> Option<u64> {
        *self.last_count.lock().unwrap()
    }

    fn record(&self, q: &QueryBuf) -> Result<(), sqlx::Error> {
        self.log.lock().unwrap().push(q.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("connection reset".into()));
        }
        Ok(())
    }

    fn param_id(q: &QueryBuf) -> i64 {
        q.params[0].as_i64().expect("id bound as $1")
    }

    fn run(&self, q: &QueryBuf) -> Vec<Record> {
        let mut t = self.tables.lock().unwrap();
        if let Some(c) = self.select_all.captures(&q.sql) {
            let mut rows = t.rows.get(&c[1]).cloned().unwrap_or_default();
            rows.sort_by(|a, b| {
                let key = |r: &Record| (r["created_at"].as_i64(), r["id"].as_i64());
                key(b).cmp(&key(a))
            });
            return rows;
        }
        if let Some(c) = self.select_one.captures(&q.sql) {
            let id = Self::param_id(q);
            return t
                .rows
                .get(&c[1])
                .and_then(|rows| rows.iter().find(|r| r["id"] == json!(id)).cloned())
                .into_iter()
                .collect();
        }
        if let Some(c) = self.insert.captures(&q.sql) {
            let table = c[1].to_string();
            let cols: Vec<String> = c[2]
                .split(", ")
                .map(|s| self.column.captures(s).expect("quoted column")[1].to_string())
                .collect();
            let placeholders: Vec<usize> = c[3]
                .split(", ")
                .map(|s| s.trim_start_matches('$').parse::<usize>().expect("placeholder"))
                .collect();
            assert_eq!(cols.len(), placeholders.len(), "columns and placeholders align");
            t.clock += 1;
            let clock = t.clock;
            let id = {
                let next = t.next_id.entry(table.clone()).or_insert(0);
                *next += 1;
                *next
            };
            let mut row = Record::new();
            row.insert("id".into(), json!(id));
            for (col, n) in cols.iter().zip(placeholders) {
                row.insert(col.clone(), q.params[n - 1].clone());
            }
            row.insert("created_at".into(), json!(clock));
            t.rows.entry(table).or_default().push(row.clone());
            return vec![row];
        }
        if let Some(c) = self.update.captures(&q.sql) {
            let id = Self::param_id(q);
            let assignments: Vec<(String, usize)> = c[2]
                .split(", ")
                .map(|s| {
                    let a = self.assignment.captures(s).expect("column = $n");
                    (a[1].to_string(), a[2].parse().expect("placeholder"))
                })
                .collect();
            let Some(rows) = t.rows.get_mut(&c[1]) else {
                return Vec::new();
            };
            return rows
                .iter_mut()
                .filter(|r| r["id"] == json!(id))
                .map(|r| {
                    for (col, n) in &assignments {
                        r.insert(col.clone(), q.params[n - 1].clone());
                    }
                    r.clone()
                })
                .collect();
        }
        panic!("unexpected statement: {}", q.sql);
    }
}

#[async_trait]
impl Executor for MemoryStore {
    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<Record>, sqlx::Error> {
        self.record(q)?;
        let rows = self.run(q);
        *self.last_count.lock().unwrap() = Some(rows.len() as u64);
        Ok(rows)
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, sqlx::Error> {
        self.record(q)?;
        let c = self.delete.captures(&q.sql).unwrap_or_else(|| panic!("unexpected statement: {}", q.sql));
        let id = Self::param_id(q);
        let mut t = self.tables.lock().unwrap();
        let rows = t.rows.entry(c[1].to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| r["id"] != json!(id));
        let affected = (before - rows.len()) as u64;
        *self.last_count.lock().unwrap() = Some(affected);
        Ok(affected)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

fn required_string() -> ValidationRule {
    ValidationRule {
        type_: Some(crudgen::config::FieldType::String),
        required: Some(true),
        min_length: Some(1),
        ..Default::default()
    }
}

/// The `notes` entity: title and content, both required non-empty strings.
pub fn notes_config() -> EntityConfig {
    EntityConfig {
        name: "notes".into(),
        table: "notes".into(),
        fields: vec!["title".into(), "content".into()],
        validation: HashMap::from([
            ("title".to_string(), required_string()),
            ("content".to_string(), required_string()),
        ]),
        column_types: HashMap::new(),
    }
}

pub fn notes_descriptor() -> EntityDescriptor {
    resolve(&[notes_config()]).unwrap().remove(0).descriptor
}

pub fn fields(record: &Record, names: &[&str]) -> Value {
    Value::Object(
        names
            .iter()
            .map(|n| (n.to_string(), record.get(*n).cloned().unwrap_or(Value::Null)))
            .collect(),
    )
}
