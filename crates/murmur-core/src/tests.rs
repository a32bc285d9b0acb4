//! Tests for the record graph against a small chat-shaped schema.

use std::{
  cmp::Ordering,
  sync::atomic::{AtomicUsize, Ordering as AtomicOrdering},
};

use serde_json::{Value, json};

use crate::{
  Changes, Computed, Error, ErrorClass, Field, ModelDef, ModelRegistry, RecordId,
  RelationCommand, Result, Store,
};

fn thread_admin(store: &Store, thread: RecordId) -> Result<Computed> {
  Ok(Computed::one(store.many(thread, "members")?.first().copied()))
}

fn thread_admin_name(store: &Store, thread: RecordId) -> Result<Computed> {
  match store.one(thread, "admin")? {
    Some(persona) => Ok(Computed::Attr(store.attr(persona, "name")?)),
    None => Ok(Computed::Attr(Value::Null)),
  }
}

static MEMBER_COUNT_RUNS: AtomicUsize = AtomicUsize::new(0);

fn thread_member_count(store: &Store, thread: RecordId) -> Result<Computed> {
  MEMBER_COUNT_RUNS.fetch_add(1, AtomicOrdering::SeqCst);
  Ok(Computed::attr(store.many(thread, "members")?.len()))
}

fn by_id(store: &Store, a: RecordId, b: RecordId) -> Ordering {
  let id = |r| store.attr(r, "id").ok().and_then(|v| v.as_i64()).unwrap_or_default();
  id(a).cmp(&id(b))
}

fn registry() -> ModelRegistry {
  let mut registry = ModelRegistry::new();
  registry
    .register(
      ModelDef::new("Thread")
        .id(["id"])
        .field(Field::attr("id"))
        .field(Field::attr("name"))
        .field(Field::attr("description"))
        .field(Field::many("members", "Persona").inverse("thread"))
        .field(Field::many("messages", "Message").inverse("thread").sort(by_id))
        .field(Field::one("admin", "Persona").compute(thread_admin))
        .field(Field::attr("admin_name").compute(thread_admin_name))
        .field(Field::attr("member_count").compute(thread_member_count)),
    )
    .register(
      ModelDef::new("Persona")
        .id(["id"])
        .field(Field::attr("id"))
        .field(Field::attr("name"))
        .field(Field::one("thread", "Thread").inverse("members")),
    )
    .register(
      ModelDef::new("Message")
        .id(["id"])
        .field(Field::attr("id"))
        .field(Field::attr("body"))
        .field(Field::attr("is_note").default(false))
        .field(Field::one("thread", "Thread").inverse("messages"))
        .field(Field::one("author", "Persona")),
    )
    .register(
      ModelDef::new("Partner")
        .id(["type", "id"])
        .field(Field::attr("type"))
        .field(Field::attr("id"))
        .field(Field::attr("name")),
    )
    .register(
      ModelDef::new("Member")
        .id(["thread", "persona"])
        .field(Field::one("thread", "Thread"))
        .field(Field::one("persona", "Persona"))
        .field(Field::attr("role")),
    );
  registry
}

fn store() -> Store { Store::new(registry()).expect("valid registry") }

fn persona(store: &Store, id: i64) -> RecordId {
  store
    .find("Persona", json!(id))
    .unwrap()
    .expect("persona exists")
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[test]
fn insert_is_idempotent() {
  let mut s = store();
  let first = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();
  let revision = s.revision();

  let second = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();

  assert_eq!(first, second);
  assert_eq!(s.len("Thread").unwrap(), 1);
  assert_eq!(s.revision(), revision);
}

#[test]
fn insert_existing_identity_updates_in_place() {
  let mut s = store();
  let first = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();
  let second = s.insert("Thread", json!({ "id": 1, "name": "Random" })).unwrap();

  assert_eq!(first, second);
  assert_eq!(s.records("Thread").unwrap(), vec![first]);
  assert_eq!(s.attr(first, "name").unwrap(), json!("Random"));
}

#[test]
fn bare_key_payload_for_single_key_models() {
  let mut s = store();
  let thread = s.insert("Thread", json!(7)).unwrap();
  assert_eq!(s.attr(thread, "id").unwrap(), json!(7));
  assert_eq!(s.find("Thread", json!(7)).unwrap(), Some(thread));
  assert_eq!(s.find("Thread", json!(8)).unwrap(), None);
}

#[test]
fn composite_keys_address_distinct_records() {
  let mut s = store();
  let partner = s
    .insert("Partner", json!({ "type": "partner", "id": 3, "name": "Ann" }))
    .unwrap();
  let guest = s
    .insert("Partner", json!({ "type": "guest", "id": 3, "name": "Bob" }))
    .unwrap();

  assert_ne!(partner, guest);
  assert_eq!(
    s.find("Partner", json!({ "type": "guest", "id": 3 })).unwrap(),
    Some(guest)
  );
  assert_eq!(s.key_of(partner).unwrap().to_string(), r#"("partner", 3)"#);
}

#[test]
fn relational_keys_insert_their_targets() {
  let mut s = store();
  let member = s
    .insert(
      "Member",
      json!({ "thread": { "id": 1, "name": "General" }, "persona": 9, "role": "admin" }),
    )
    .unwrap();
  let again = s
    .insert("Member", json!({ "thread": 1, "persona": { "id": 9, "name": "John" } }))
    .unwrap();

  assert_eq!(member, again);
  assert_eq!(s.attr(member, "role").unwrap(), json!("admin"));
  let john = persona(&s, 9);
  assert_eq!(s.attr(john, "name").unwrap(), json!("John"));
  assert_eq!(s.one(member, "persona").unwrap(), Some(john));
  assert_eq!(
    s.find("Member", json!({ "thread": 1, "persona": 9 })).unwrap(),
    Some(member)
  );
}

#[test]
fn missing_identity_is_rejected() {
  let mut s = store();
  let err = s.insert("Thread", json!({ "name": "General" })).unwrap_err();
  assert!(matches!(err, Error::MissingIdentity { ref field, .. } if field == "id"));
  assert_eq!(err.class(), ErrorClass::Identity);

  let err = s.insert("Partner", json!({ "id": 3, "type": null })).unwrap_err();
  assert!(matches!(err, Error::MissingIdentity { ref field, .. } if field == "type"));
}

#[test]
fn malformed_identity_is_rejected() {
  let mut s = store();
  let err = s.insert("Thread", json!({ "id": 1.5 })).unwrap_err();
  assert!(matches!(err, Error::MalformedIdentity { .. }));

  let err = s.insert("Partner", json!(3)).unwrap_err();
  assert!(matches!(err, Error::MalformedIdentity { .. }));
}

#[test]
fn changing_a_key_reindexes_and_refuses_collisions() {
  let mut s = store();
  let one = s.insert("Thread", json!(1)).unwrap();
  let two = s.insert("Thread", json!(2)).unwrap();

  s.set(one, "id", 3).unwrap();
  assert_eq!(s.find("Thread", json!(3)).unwrap(), Some(one));
  assert_eq!(s.find("Thread", json!(1)).unwrap(), None);

  let err = s.set(two, "id", 3).unwrap_err();
  assert!(matches!(err, Error::DuplicateIdentity { .. }));
  assert_eq!(s.attr(two, "id").unwrap(), json!(2));
}

#[test]
fn identity_helpers_compare_by_handle() {
  let mut s = store();
  let a = s.insert("Persona", json!({ "id": 1, "name": "Same" })).unwrap();
  let b = s.insert("Persona", json!({ "id": 2, "name": "Same" })).unwrap();

  assert_ne!(a, b);
  assert!(a.is_in(&[a, b]));
  assert!(a.is_not_in(&[b]));
  assert!(b.is_in(s.records("Persona").unwrap().iter()));
}

// ─── Schema and model errors ─────────────────────────────────────────────────

#[test]
fn unknown_model_and_field_are_rejected() {
  let mut s = store();
  let err = s.insert("Channel", json!(1)).unwrap_err();
  assert!(matches!(err, Error::UnknownModel(ref m) if m == "Channel"));
  assert_eq!(err.class(), ErrorClass::Model);

  let err = s.insert("Thread", json!({ "id": 1, "topic": "x" })).unwrap_err();
  assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "topic"));
  assert_eq!(err.class(), ErrorClass::Schema);
  assert_eq!(s.len("Thread").unwrap(), 0);
}

#[test]
fn computed_fields_cannot_be_assigned() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  let err = s.update(thread, json!({ "admin_name": "x" })).unwrap_err();
  assert!(matches!(err, Error::ComputedAssignment { .. }));
}

#[test]
fn payload_is_validated_before_writing() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();
  let err = s
    .update(thread, json!({ "name": "Renamed", "nope": true }))
    .unwrap_err();
  assert!(matches!(err, Error::UnknownField { .. }));
  assert_eq!(s.attr(thread, "name").unwrap(), json!("General"));
}

#[test]
fn typed_changes_check_field_kinds() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  let err = s.apply(thread, Changes::new().set("members", 3)).unwrap_err();
  assert!(matches!(err, Error::KindMismatch { expected: "attr", actual: "many", .. }));

  let err = s.attr(thread, "members").unwrap_err();
  assert!(matches!(err, Error::KindMismatch { .. }));
}

#[test]
fn asymmetric_inverse_fails_verification() {
  let mut registry = registry();
  registry.register(
    ModelDef::new("Persona")
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::one("thread", "Thread")),
  );
  let err = Store::new(registry).unwrap_err();
  assert!(matches!(err, Error::AsymmetricInverse { ref model, .. } if model == "Thread"));
}

#[test]
fn missing_inverse_fails_verification() {
  let mut registry = ModelRegistry::new();
  registry
    .register(
      ModelDef::new("A")
        .id(["id"])
        .field(Field::attr("id"))
        .field(Field::many("bs", "B").inverse("a")),
    )
    .register(ModelDef::new("B").id(["id"]).field(Field::attr("id")));
  let err = Store::new(registry).unwrap_err();
  assert!(matches!(err, Error::UnknownInverse { ref inverse, .. } if inverse == "a"));
}

#[test]
fn unregistered_target_fails_verification() {
  let mut registry = ModelRegistry::new();
  registry.register(
    ModelDef::new("A")
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::one("b", "B")),
  );
  let err = Store::new(registry).unwrap_err();
  assert!(matches!(err, Error::UnknownModel(ref m) if m == "B"));
}

#[test]
fn identifying_fields_must_be_stored_scalars_or_single_relations() {
  let mut registry = ModelRegistry::new();
  registry.register(
    ModelDef::new("A")
      .id(["tags"])
      .field(Field::many("tags", "A")),
  );
  let err = Store::new(registry).unwrap_err();
  assert!(matches!(err, Error::InvalidIdentityField { .. }));
}

#[test]
fn registering_twice_replaces_and_extend_composes() {
  let mut registry = registry();
  registry.register(ModelDef::new("Partner").id(["id"]).field(Field::attr("id")));
  assert!(registry.model("Partner").unwrap().get("name").is_none());

  registry
    .extend("Partner", |def| def.field(Field::attr("email")))
    .unwrap();
  let partner = registry.model("Partner").unwrap();
  assert!(partner.get("id").is_some());
  assert!(partner.get("email").is_some());

  assert!(matches!(
    registry.extend("Nope", |def| def),
    Err(Error::UnknownModel(_))
  ));
}

// ─── Relations ───────────────────────────────────────────────────────────────

#[test]
fn members_and_their_inverse_stay_in_sync() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();
  assert_eq!(s.attr(thread, "name").unwrap(), json!("General"));
  assert!(s.many(thread, "members").unwrap().is_empty());

  s.update(
    thread,
    json!({ "members": [["add", [{ "id": 9, "name": "John" }, { "id": 10, "name": "Fred" }]]] }),
  )
  .unwrap();
  let john = persona(&s, 9);
  let fred = persona(&s, 10);

  assert_eq!(s.many(thread, "members").unwrap(), vec![john, fred]);
  assert_eq!(s.one(john, "thread").unwrap(), Some(thread));
  assert_eq!(s.one(fred, "thread").unwrap(), Some(thread));

  s.unlink(thread, "members", john).unwrap();

  assert_eq!(s.one(john, "thread").unwrap(), None);
  assert_eq!(s.many(thread, "members").unwrap(), vec![fred]);
  assert!(s.exists(john));
}

#[test]
fn assigning_the_single_side_updates_the_collection_side() {
  let mut s = store();
  let general = s.insert("Thread", json!(1)).unwrap();
  let random = s.insert("Thread", json!(2)).unwrap();
  let john = s.insert("Persona", json!({ "id": 9, "thread": 1 })).unwrap();

  assert_eq!(s.many(general, "members").unwrap(), vec![john]);

  s.update(john, json!({ "thread": 2 })).unwrap();
  assert!(s.many(general, "members").unwrap().is_empty());
  assert_eq!(s.many(random, "members").unwrap(), vec![john]);

  s.update(john, json!({ "thread": null })).unwrap();
  assert!(s.many(random, "members").unwrap().is_empty());
  assert_eq!(s.one(john, "thread").unwrap(), None);
}

#[test]
fn adding_to_another_collection_moves_the_single_side() {
  let mut s = store();
  let general = s.insert("Thread", json!(1)).unwrap();
  let random = s.insert("Thread", json!(2)).unwrap();
  let john = s.insert("Persona", json!(9)).unwrap();

  s.link(general, "members", john).unwrap();
  s.link(random, "members", john).unwrap();

  assert!(john.is_not_in(&s.many(general, "members").unwrap()));
  assert_eq!(s.many(random, "members").unwrap(), vec![john]);
  assert_eq!(s.one(john, "thread").unwrap(), Some(random));
}

#[test]
fn collections_deduplicate_by_identity() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  s.update(thread, json!({ "members": [9, 9, { "id": 9 }] })).unwrap();
  assert_eq!(s.many(thread, "members").unwrap().len(), 1);
}

#[test]
fn replace_sets_exact_membership_and_order() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  s.update(thread, json!({ "members": [1, 2, 3] })).unwrap();
  let (p1, p2, p3) = (persona(&s, 1), persona(&s, 2), persona(&s, 3));

  s.update(thread, json!({ "members": [3, 1] })).unwrap();

  assert_eq!(s.many(thread, "members").unwrap(), vec![p3, p1]);
  assert_eq!(s.one(p2, "thread").unwrap(), None);
  assert_eq!(s.one(p3, "thread").unwrap(), Some(thread));
}

#[test]
fn command_lists_apply_in_order() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  s.update(
    thread,
    json!({ "members": [["add", [1, 2, 3]], ["remove", 2], ["remove", 42]] }),
  )
  .unwrap();
  let ids: Vec<_> = s
    .many(thread, "members")
    .unwrap()
    .into_iter()
    .map(|p| s.attr(p, "id").unwrap())
    .collect();
  assert_eq!(ids, vec![json!(1), json!(3)]);
  assert_eq!(s.len("Persona").unwrap(), 3);

  s.update(thread, json!({ "members": [["clear"]] })).unwrap();
  assert!(s.many(thread, "members").unwrap().is_empty());
}

#[test]
fn delete_command_unlinks_and_deletes() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "members": [1, 2] })).unwrap();
  s.command(thread, "members", RelationCommand::delete([json!(1)]))
    .unwrap();

  assert_eq!(s.len("Persona").unwrap(), 1);
  assert_eq!(s.find("Persona", json!(1)).unwrap(), None);
  assert_eq!(s.many(thread, "members").unwrap(), vec![persona(&s, 2)]);
}

#[test]
fn malformed_commands_are_rejected() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  for payload in [
    json!({ "members": [["explode", 1]] }),
    json!({ "members": [["clear", 1]] }),
    json!({ "members": [["add"]] }),
    json!({ "members": [["add", 1], 2] }),
  ] {
    let err = s.update(thread, payload).unwrap_err();
    assert!(matches!(err, Error::InvalidCommand(_)), "{err}");
  }
}

#[test]
fn linking_a_record_of_the_wrong_model_fails() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  let other = s.insert("Thread", json!(2)).unwrap();
  let err = s.link(thread, "members", other).unwrap_err();
  assert!(matches!(err, Error::TargetMismatch { .. }));
}

#[test]
fn sorted_collections_keep_their_order() {
  let mut s = store();
  let thread = s.insert("Thread", json!(1)).unwrap();
  for id in [5, 2, 9, 1] {
    s.insert("Message", json!({ "id": id, "thread": 1 })).unwrap();
  }
  let ids: Vec<_> = s
    .many(thread, "messages")
    .unwrap()
    .into_iter()
    .map(|m| s.attr(m, "id").unwrap())
    .collect();
  assert_eq!(ids, vec![json!(1), json!(2), json!(5), json!(9)]);
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[test]
fn partial_update_leaves_absent_fields_untouched() {
  let mut s = store();
  let thread = s
    .insert("Thread", json!({ "id": 1, "name": "General", "description": "x" }))
    .unwrap();
  s.update(thread, json!({ "name": "Lobby" })).unwrap();

  assert_eq!(s.attr(thread, "name").unwrap(), json!("Lobby"));
  assert_eq!(s.attr(thread, "description").unwrap(), json!("x"));
}

#[test]
fn defaults_apply_on_creation_only() {
  let mut s = store();
  let message = s.insert("Message", json!(1)).unwrap();
  assert_eq!(s.attr(message, "is_note").unwrap(), json!(false));
  assert_eq!(s.attr(message, "body").unwrap(), Value::Null);

  s.set(message, "is_note", true).unwrap();
  s.insert("Message", json!({ "id": 1, "body": "hi" })).unwrap();
  assert_eq!(s.attr(message, "is_note").unwrap(), json!(true));
}

#[test]
fn attr_as_deserialises_values() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 4, "name": "General" })).unwrap();
  assert_eq!(s.attr_as::<i64>(thread, "id").unwrap(), Some(4));
  assert_eq!(s.attr_as::<String>(thread, "description").unwrap(), None);
  assert!(matches!(
    s.attr_as::<i64>(thread, "name"),
    Err(Error::Serialization(_))
  ));
}

#[test]
fn root_is_a_singleton() {
  let mut s = store();
  let root = s.root();
  assert_eq!(s.insert("Store", json!({})).unwrap(), root);
  assert_eq!(s.find("Store", Value::Null).unwrap(), Some(root));
  assert!(matches!(s.delete(root), Err(Error::RootDeletion)));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[test]
fn deleting_a_thread_keeps_its_messages() {
  let mut s = store();
  let message = s.insert("Message", json!({ "id": 1, "body": "hello" })).unwrap();
  let thread = s.insert("Thread", json!(1)).unwrap();
  s.link(message, "thread", thread).unwrap();
  assert_eq!(s.many(thread, "messages").unwrap(), vec![message]);

  s.delete(thread).unwrap();

  assert!(s.exists(message));
  assert_eq!(s.one(message, "thread").unwrap(), None);
  assert!(thread.is_not_in(&s.records("Thread").unwrap()));
  assert!(matches!(s.attr(thread, "name"), Err(Error::RecordNotFound(r)) if r == thread));
}

#[test]
fn deleting_clears_every_relation() {
  let mut s = store();
  let thread = s
    .insert("Thread", json!({ "id": 1, "members": [9, 10] }))
    .unwrap();
  let john = persona(&s, 9);
  let fred = persona(&s, 10);
  let message = s
    .insert("Message", json!({ "id": 3, "thread": 1, "author": 9 }))
    .unwrap();

  s.delete(john).unwrap();

  assert_eq!(s.many(thread, "members").unwrap(), vec![fred]);
  assert_eq!(s.one(message, "author").unwrap(), None);
  assert_eq!(s.find("Persona", json!(9)).unwrap(), None);

  s.delete(thread).unwrap();
  assert_eq!(s.one(fred, "thread").unwrap(), None);
  assert_eq!(s.one(message, "thread").unwrap(), None);
}

#[test]
fn deleted_identity_can_be_reinserted() {
  let mut s = store();
  let old = s.insert("Thread", json!({ "id": 1, "name": "Old" })).unwrap();
  s.delete(old).unwrap();
  let new = s.insert("Thread", json!(1)).unwrap();

  assert_ne!(old, new);
  assert_eq!(s.attr(new, "name").unwrap(), Value::Null);
}

// ─── Computed fields ─────────────────────────────────────────────────────────

#[test]
fn computed_admin_follows_first_member() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "members": [9, 10] })).unwrap();
  let john = persona(&s, 9);
  let fred = persona(&s, 10);
  assert_eq!(s.one(thread, "admin").unwrap(), Some(john));

  s.unlink(thread, "members", john).unwrap();
  assert_eq!(s.one(thread, "admin").unwrap(), Some(fred));

  s.delete(fred).unwrap();
  assert_eq!(s.one(thread, "admin").unwrap(), None);
}

#[test]
fn computed_of_computed_recomputes_transitively() {
  let mut s = store();
  let thread = s
    .insert("Thread", json!({ "id": 1, "members": [{ "id": 9, "name": "John" }] }))
    .unwrap();
  assert_eq!(s.attr(thread, "admin_name").unwrap(), json!("John"));

  s.update(persona(&s, 9), json!({ "name": "Johnny" })).unwrap();
  assert_eq!(s.attr(thread, "admin_name").unwrap(), json!("Johnny"));

  s.update(thread, json!({ "members": [["add", { "id": 10, "name": "Fred" }]] }))
    .unwrap();
  assert_eq!(s.attr(thread, "admin_name").unwrap(), json!("Johnny"));

  s.unlink(thread, "members", persona(&s, 9)).unwrap();
  assert_eq!(s.attr(thread, "admin_name").unwrap(), json!("Fred"));
}

#[test]
fn computed_values_are_memoised_until_a_dependency_changes() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "members": [9] })).unwrap();
  let runs = || MEMBER_COUNT_RUNS.load(AtomicOrdering::SeqCst);

  let before = runs();
  assert_eq!(s.attr(thread, "member_count").unwrap(), json!(1));
  assert_eq!(s.attr(thread, "member_count").unwrap(), json!(1));
  assert_eq!(runs(), before + 1);

  s.set(thread, "name", "unrelated").unwrap();
  assert_eq!(s.attr(thread, "member_count").unwrap(), json!(1));
  assert_eq!(runs(), before + 1);

  let fred = s.insert("Persona", json!(10)).unwrap();
  s.link(thread, "members", fred).unwrap();
  assert_eq!(s.attr(thread, "member_count").unwrap(), json!(2));
  assert_eq!(runs(), before + 2);
}

fn self_referential(store: &Store, record: RecordId) -> Result<Computed> {
  store.attr(record, "looped").map(Computed::Attr)
}

#[test]
fn self_dependent_computes_fail() {
  let mut registry = ModelRegistry::new();
  registry.register(
    ModelDef::new("Loop")
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::attr("looped").compute(self_referential)),
  );
  let mut s = Store::new(registry).unwrap();
  let record = s.insert("Loop", json!(1)).unwrap();
  let err = s.attr(record, "looped").unwrap_err();
  assert!(matches!(err, Error::ComputeCycle { .. }));
  assert_eq!(err.class(), ErrorClass::Runtime);
}

fn wrong_kind(_: &Store, _: RecordId) -> Result<Computed> { Ok(Computed::attr(1)) }

#[test]
fn computes_must_return_their_field_kind() {
  let mut registry = ModelRegistry::new();
  registry.register(
    ModelDef::new("Odd")
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::one("peer", "Odd").compute(wrong_kind)),
  );
  let mut s = Store::new(registry).unwrap();
  let record = s.insert("Odd", json!(1)).unwrap();
  assert!(matches!(s.one(record, "peer"), Err(Error::KindMismatch { .. })));
}

// ─── Observers ───────────────────────────────────────────────────────────────

#[test]
fn observers_go_stale_when_something_they_read_changes() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();
  let other = s.insert("Thread", json!({ "id": 2, "name": "Random" })).unwrap();

  let (name, id) = s.observe(|s| s.attr(thread, "name").unwrap());
  assert_eq!(name, json!("General"));
  assert!(!s.is_stale(id));

  s.set(other, "name", "Other").unwrap();
  assert!(!s.is_stale(id));

  s.set(thread, "name", "General").unwrap();
  assert!(!s.is_stale(id));

  s.set(thread, "name", "Lobby").unwrap();
  assert!(s.is_stale(id));
  assert_eq!(s.take_stale(), vec![id]);

  let name = s.refresh(id, |s| s.attr(thread, "name").unwrap()).unwrap();
  assert_eq!(name, json!("Lobby"));
  assert!(!s.is_stale(id));

  s.unobserve(id);
  s.set(thread, "name", "Gone").unwrap();
  assert!(s.take_stale().is_empty());
  assert!(s.refresh(id, |_| ()).is_none());
}

#[test]
fn refreshing_an_observer_from_inside_itself_is_refused() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "name": "General" })).unwrap();
  let other = s.insert("Thread", json!({ "id": 2, "name": "Random" })).unwrap();
  let (_, id) = s.observe(|s| s.attr(other, "name").unwrap());

  let nested = s
    .refresh(id, |s| {
      let nested = s.refresh(id, |s| s.attr(other, "name").unwrap());
      s.attr(thread, "name").unwrap();
      nested
    })
    .unwrap();
  assert_eq!(nested, None);

  s.set(other, "name", "Other").unwrap();
  assert!(!s.is_stale(id));
  s.set(thread, "name", "Lobby").unwrap();
  assert!(s.is_stale(id));
}

#[test]
fn observers_track_collections_and_computed_fields() {
  let mut s = store();
  let thread = s.insert("Thread", json!({ "id": 1, "members": [9] })).unwrap();

  let (_, listing) = s.observe(|s| s.records("Thread").unwrap().len());
  let (_, admin) = s.observe(|s| s.one(thread, "admin").unwrap());

  s.insert("Thread", json!(2)).unwrap();
  assert!(s.is_stale(listing));
  assert!(!s.is_stale(admin));

  s.update(thread, json!({ "members": [10] })).unwrap();
  assert!(s.is_stale(admin));
}
