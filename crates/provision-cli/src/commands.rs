//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context as _, bail};
use bson::Bson;
use provision_core::{
  memory::MemoryTarget,
  plan::{COMPLETION_MESSAGE, Plan},
  run::provision,
  target::ProvisionTarget,
  validator::alias_of,
  verify::verify as diff,
};
use provision_mongo::{MongoSettings, MongoTarget};
use tracing::{info, warn};

// ─── init ────────────────────────────────────────────────────────────────────

pub async fn init(settings: &MongoSettings) -> anyhow::Result<()> {
  let target = MongoTarget::connect(settings)
    .await
    .context("failed to connect to MongoDB")?;
  let plan = Plan::customers();

  let report = provision(&target, &plan).await?;
  info!(
    database = %report.database,
    steps = report.completed.len(),
    "provisioning finished"
  );

  println!("{COMPLETION_MESSAGE}");
  Ok(())
}

pub async fn dry_run() -> anyhow::Result<()> {
  let target = MemoryTarget::new();
  let report = provision(&target, &Plan::customers()).await?;
  for step in &report.completed {
    println!("{step}");
  }
  Ok(())
}

// ─── verify ──────────────────────────────────────────────────────────────────

pub async fn verify(settings: &MongoSettings) -> anyhow::Result<()> {
  let target = MongoTarget::connect(settings)
    .await
    .context("failed to connect to MongoDB")?;
  let plan = Plan::customers();

  let snapshot = target
    .inspect(&plan.database, &plan.user.name, &plan.collection.name)
    .await
    .context("failed to inspect the target database")?;

  let drift = diff(&plan, &snapshot);
  if drift.is_empty() {
    println!("{} matches the plan", plan.database);
    return Ok(());
  }

  for d in &drift {
    println!("{d}");
  }
  bail!("{} differs from the plan in {} place(s)", plan.database, drift.len())
}

// ─── plan ────────────────────────────────────────────────────────────────────

pub fn plan() -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(&render_plan(&Plan::customers()))?);
  Ok(())
}

/// The plan as JSON, without the password.
fn render_plan(plan: &Plan) -> serde_json::Value {
  serde_json::json!({
    "database": plan.database,
    "user": {
      "name": plan.user.name,
      "roles": plan.user.roles,
    },
    "collection": {
      "name": plan.collection.name,
      "validator": Bson::Document(plan.collection.validator.clone()).into_relaxed_extjson(),
    },
    "indexes": plan.indexes,
  })
}

// ─── check ───────────────────────────────────────────────────────────────────

/// Insert each document into a freshly provisioned in-memory server, so that
/// `_id` assignment, the validator and the unique indexes all apply exactly
/// as they would on first load.
pub async fn check(file: &Path) -> anyhow::Result<()> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let documents = parse_documents(&raw)
    .with_context(|| format!("parsing {}", file.display()))?;

  let plan = Plan::customers();
  let target = MemoryTarget::new();
  provision(&target, &plan).await?;

  let mut rejected = 0;
  for (n, document) in documents.into_iter().enumerate() {
    match target.insert(&plan.database, &plan.collection.name, document) {
      Ok(id) => println!("#{n}: ok ({id})"),
      Err(e) => {
        warn!(document = n, error = %e, "document rejected");
        println!("#{n}: rejected: {e}");
        rejected += 1;
      }
    }
  }

  if rejected > 0 {
    bail!("{rejected} document(s) rejected");
  }
  Ok(())
}

/// Accept a single extended-JSON document or an array of them.
fn parse_documents(raw: &str) -> anyhow::Result<Vec<bson::Document>> {
  let value: serde_json::Value = serde_json::from_str(raw)?;
  let items = match value {
    serde_json::Value::Array(items) => items,
    other => vec![other],
  };

  items
    .into_iter()
    .enumerate()
    .map(|(n, item)| -> anyhow::Result<bson::Document> {
      match Bson::try_from(item)? {
        Bson::Document(doc) => Ok(doc),
        other => bail!("#{n}: expected a document, found {}", alias_of(&other)),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extended_json_keeps_storage_types() {
    let docs = parse_documents(
      r#"{
        "_id": { "$numberLong": "1" },
        "name": "Ana Silva",
        "email": "ana@example.com",
        "cpf": "12345678901",
        "created_at": { "$date": "2024-05-01T12:00:00Z" },
        "updated_at": { "$date": "2024-05-01T12:00:00Z" }
      }"#,
    )
    .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("_id"), Some(&Bson::Int64(1)));
    assert!(matches!(docs[0].get("created_at"), Some(Bson::DateTime(_))));
  }

  #[test]
  fn array_input_yields_every_document() {
    let docs = parse_documents(r#"[{ "name": "a" }, { "name": "b" }]"#).unwrap();
    assert_eq!(docs.len(), 2);
  }

  #[test]
  fn scalar_input_is_rejected() {
    assert!(parse_documents("42").is_err());
  }

  #[test]
  fn rendered_plan_omits_password() {
    let rendered = render_plan(&Plan::customers()).to_string();
    assert!(!rendered.contains("app_password"));
    assert!(rendered.contains("\"cpf_1\""));
    assert!(rendered.contains("$jsonSchema"));
  }
}
