//! End-to-end runs of the customer plan against `MemoryTarget`.

use bson::{Bson, DateTime, doc};

use crate::{
  Error,
  customer::Customer,
  memory::MemoryTarget,
  plan::{CUSTOMERS, DATABASE, Plan, Step},
  run::provision,
  target::ProvisionTarget,
  verify::verify,
};

async fn provisioned() -> MemoryTarget {
  let target = MemoryTarget::new();
  provision(&target, &Plan::customers())
    .await
    .expect("fresh target provisions");
  target
}

fn insert(target: &MemoryTarget, customer: &Customer) -> crate::Result<Bson> {
  target.insert(DATABASE, CUSTOMERS, customer.to_document()?)
}

fn ana() -> Customer {
  Customer::new(1, "Ana Silva", "ana@example.com", "12345678901")
}

// ─── Provisioning ────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_run_completes_every_step() {
  let target = MemoryTarget::new();
  let plan = Plan::customers();
  let report = provision(&target, &plan).await.unwrap();

  assert_eq!(report.database, DATABASE);
  assert_eq!(report.completed, plan.steps());
}

#[tokio::test]
async fn fresh_run_leaves_no_drift() {
  let target = provisioned().await;
  let plan = Plan::customers();
  let snapshot = target
    .inspect(&plan.database, &plan.user.name, &plan.collection.name)
    .await
    .unwrap();
  assert!(verify(&plan, &snapshot).is_empty());
}

#[tokio::test]
async fn rerun_fails_on_existing_user() {
  let target = provisioned().await;
  let err = provision(&target, &Plan::customers()).await.unwrap_err();

  assert!(matches!(err.step, Step::CreateUser { .. }));
  assert!(matches!(err.source, Error::UserExists { .. }));
  // Only the database selection ran before the failure.
  assert_eq!(err.completed.len(), 1);
}

#[tokio::test]
async fn existing_collection_aborts_before_indexes() {
  let target = MemoryTarget::new();
  target.insert(DATABASE, CUSTOMERS, doc! { "_id": 1_i64 }).unwrap();

  let err = provision(&target, &Plan::customers()).await.unwrap_err();
  assert!(matches!(err.step, Step::CreateCollection { .. }));
  assert!(matches!(err.source, Error::NamespaceExists(ref ns) if ns == "fastfood_10soat_g22_tc4.customers"));

  let plan = Plan::customers();
  let snapshot = target.inspect(DATABASE, &plan.user.name, CUSTOMERS).await.unwrap();
  assert!(snapshot.indexes.is_empty());
}

// ─── Validator ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_record_is_accepted() {
  let target = provisioned().await;
  let id = insert(&target, &ana()).unwrap();
  assert_eq!(id, Bson::Int64(1));
  assert_eq!(target.count(DATABASE, CUSTOMERS), 1);
}

#[tokio::test]
async fn record_missing_required_field_is_rejected() {
  let target = provisioned().await;
  for field in ["name", "email", "cpf", "created_at", "updated_at"] {
    let mut doc = ana().to_document().unwrap();
    doc.remove(field);
    let err = target.insert(DATABASE, CUSTOMERS, doc).unwrap_err();
    assert!(matches!(err, Error::DocumentValidation(_)), "missing {field}");
  }
  assert_eq!(target.count(DATABASE, CUSTOMERS), 0);
}

#[tokio::test]
async fn record_with_malformed_cpf_is_rejected() {
  let target = provisioned().await;
  let mut customer = ana();
  customer.cpf = "123.456.78901".into();
  let err = insert(&target, &customer).unwrap_err();
  assert_eq!(
    err.to_string(),
    "document failed validation: cpf: does not match \
     /^[0-9]{11}$|^[0-9]{3}\\.[0-9]{3}\\.[0-9]{3}-[0-9]{2}$/"
  );
}

#[tokio::test]
async fn record_without_id_gets_object_id_and_is_rejected() {
  let target = provisioned().await;
  let now = DateTime::now();
  let err = target
    .insert(DATABASE, CUSTOMERS, doc! {
      "name": "Ana Silva",
      "email": "ana@example.com",
      "cpf": "12345678901",
      "created_at": now,
      "updated_at": now,
    })
    .unwrap_err();
  assert!(err.to_string().contains("_id: expected long, found objectId"));
}

// ─── Unique indexes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let target = provisioned().await;
  insert(&target, &ana()).unwrap();

  let twin = Customer::new(2, "Ana Souza", "ana@example.com", "98765432100");
  let err = insert(&target, &twin).unwrap_err();
  assert!(matches!(err, Error::DuplicateKey { ref index, .. } if index == "email_1"));
  assert_eq!(target.count(DATABASE, CUSTOMERS), 1);
}

#[tokio::test]
async fn duplicate_cpf_is_rejected() {
  let target = provisioned().await;
  insert(&target, &ana()).unwrap();

  let twin = Customer::new(2, "Ana Souza", "souza@example.com", "12345678901");
  let err = insert(&target, &twin).unwrap_err();
  assert!(matches!(err, Error::DuplicateKey { ref index, .. } if index == "cpf_1"));
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
  let target = provisioned().await;
  insert(&target, &ana()).unwrap();

  let other = Customer::new(1, "Bruno", "bruno@example.com", "11122233344");
  let err = insert(&target, &other).unwrap_err();
  assert!(matches!(err, Error::DuplicateKey { ref index, .. } if index == "_id_"));
}

#[tokio::test]
async fn distinct_records_coexist() {
  let target = provisioned().await;
  insert(&target, &ana()).unwrap();
  insert(&target, &Customer::new(2, "Bruno", "bruno@example.com", "111.222.333-44"))
    .unwrap();
  assert_eq!(target.count(DATABASE, CUSTOMERS), 2);
}

#[tokio::test]
async fn unique_index_build_fails_on_existing_duplicates() {
  let target = MemoryTarget::new();
  let plan = Plan::customers();
  target.insert(DATABASE, "scratch", doc! { "_id": 1_i64, "cpf": "1" }).unwrap();
  target.insert(DATABASE, "scratch", doc! { "_id": 2_i64, "cpf": "1" }).unwrap();

  let err = target
    .create_index(DATABASE, "scratch", &plan.indexes[0])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateKey { .. }));
}

#[tokio::test]
async fn recreating_identical_index_is_a_noop() {
  let target = provisioned().await;
  let plan = Plan::customers();
  target
    .create_index(DATABASE, CUSTOMERS, &plan.indexes[0])
    .await
    .unwrap();

  let mut renamed = plan.indexes[0].clone();
  renamed.name = "cpf_unique".into();
  let err = target.create_index(DATABASE, CUSTOMERS, &renamed).await.unwrap_err();
  assert!(matches!(err, Error::IndexConflict { .. }));
}
