use casbin_sql_adapter::{
    with_table_name, Adapter, Model, PolicyAdapter, SqliteClient, DEFAULT_TABLE_NAME,
};

fn open_adapter() -> Adapter<SqliteClient> {
    let client = SqliteClient::open_in_memory().unwrap();
    let mut adapter =
        Adapter::with_client(client, [with_table_name("", DEFAULT_TABLE_NAME)]).unwrap();
    adapter.ensure_table().unwrap();
    adapter
}

fn rule(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn load(adapter: &mut Adapter<SqliteClient>) -> Model {
    let mut model = Model::new();
    adapter.load_policy(&mut model).unwrap();
    model
}

fn row_count(adapter: &Adapter<SqliteClient>) -> i64 {
    adapter
        .client()
        .connection()
        .query_row("SELECT COUNT(*) FROM casbin_rule", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn added_rule_is_loaded_back() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "data1", "read"]))
        .unwrap();
    adapter.add_policy("g", "g", &rule(&["alice", "admin"])).unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["alice", "data1", "read"])]);
    assert_eq!(model.policies("g", "g"), [rule(&["alice", "admin"])]);
}

#[test]
fn empty_table_loads_nothing() {
    let mut adapter = open_adapter();
    assert!(load(&mut adapter).is_empty());
}

#[test]
fn ensure_table_is_repeatable() {
    let mut adapter = open_adapter();
    adapter.add_policy("p", "p", &rule(&["alice"])).unwrap();
    adapter.ensure_table().unwrap();
    assert_eq!(row_count(&adapter), 1);
}

#[test]
fn duplicate_adds_are_stored_twice() {
    let mut adapter = open_adapter();
    let duplicate = rule(&["bob", "data2", "write"]);
    adapter.add_policy("p", "p", &duplicate).unwrap();
    adapter.add_policy("p", "p", &duplicate).unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p").len(), 2);
}

#[test]
fn add_policies_keeps_batch_order() {
    let mut adapter = open_adapter();
    adapter
        .add_policies(
            "p",
            "p",
            &[
                rule(&["carol", "data3", "read"]),
                rule(&["alice", "data1", "read"]),
            ],
        )
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(
        model.policies("p", "p"),
        [
            rule(&["carol", "data3", "read"]),
            rule(&["alice", "data1", "read"]),
        ]
    );
}

#[test]
fn empty_add_policies_is_a_no_op() {
    let mut adapter = open_adapter();
    adapter.add_policies("p", "p", &[]).unwrap();
    assert_eq!(row_count(&adapter), 0);
}

#[test]
fn save_policy_replaces_table_contents_and_is_idempotent() {
    let mut adapter = open_adapter();
    adapter.add_policy("p", "p", &rule(&["stale", "data", "read"])).unwrap();

    let mut model = Model::new();
    model.add_policy("p", "p", rule(&["alice", "data1", "read"]));
    model.add_policy("p", "p", rule(&["bob", "data2", "write"]));
    model.add_policy("g", "g", rule(&["alice", "admin"]));

    adapter.save_policy(&model).unwrap();
    assert_eq!(load(&mut adapter), model);

    adapter.save_policy(&model).unwrap();
    assert_eq!(load(&mut adapter), model);
    assert_eq!(row_count(&adapter), 3);
}

#[test]
fn save_policy_of_empty_model_clears_table() {
    let mut adapter = open_adapter();
    adapter.add_policy("p", "p", &rule(&["alice", "data1", "read"])).unwrap();

    adapter.save_policy(&Model::new()).unwrap();
    assert_eq!(row_count(&adapter), 0);
}

#[test]
fn save_policy_skips_sections_other_than_p_and_g() {
    let mut adapter = open_adapter();
    let mut model = Model::new();
    model.add_policy("p", "p", rule(&["alice", "data1", "read"]));
    model.add_policy("e", "e", rule(&["some(where (p.eft == allow))"]));

    adapter.save_policy(&model).unwrap();
    assert_eq!(row_count(&adapter), 1);
}

#[test]
fn remove_policy_matches_all_six_fields() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "data1", "read"]))
        .unwrap();

    adapter.remove_policy("p", "p", &rule(&["alice", "data1"])).unwrap();
    assert_eq!(row_count(&adapter), 1);

    adapter.remove_policy("g", "g", &rule(&["alice", "data1", "read"])).unwrap();
    assert_eq!(row_count(&adapter), 1);

    adapter
        .remove_policy("p", "p", &rule(&["alice", "data1", "read"]))
        .unwrap();
    assert_eq!(row_count(&adapter), 0);
}

#[test]
fn removing_a_missing_rule_succeeds() {
    let mut adapter = open_adapter();
    adapter.remove_policy("p", "p", &rule(&["nobody"])).unwrap();
}

#[test]
fn remove_policies_removes_every_listed_rule() {
    let mut adapter = open_adapter();
    adapter
        .add_policies(
            "p",
            "p",
            &[
                rule(&["alice", "data1", "read"]),
                rule(&["bob", "data2", "write"]),
                rule(&["carol", "data3", "read"]),
            ],
        )
        .unwrap();

    adapter
        .remove_policies(
            "p",
            "p",
            &[rule(&["alice", "data1", "read"]), rule(&["carol", "data3", "read"])],
        )
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["bob", "data2", "write"])]);
}

#[test]
fn remove_filtered_policy_matches_from_field_index() {
    let mut adapter = open_adapter();
    adapter
        .add_policies(
            "p",
            "p",
            &[
                rule(&["alice", "data1", "read"]),
                rule(&["bob", "data1", "read"]),
                rule(&["bob", "data1", "write"]),
            ],
        )
        .unwrap();
    adapter.add_policy("g", "g", &rule(&["carol", "data1", "read"])).unwrap();

    adapter
        .remove_filtered_policy("p", "p", 1, &rule(&["data1", "read"]))
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["bob", "data1", "write"])]);
    assert_eq!(model.policies("g", "g"), [rule(&["carol", "data1", "read"])]);
}

#[test]
fn update_policy_rewrites_matching_rows() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "data1", "read"]))
        .unwrap();

    adapter
        .update_policy(
            "p",
            "p",
            &rule(&["alice", "data1", "read"]),
            &rule(&["alice", "data1", "write"]),
        )
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["alice", "data1", "write"])]);
}

#[test]
fn update_policy_of_missing_rule_changes_nothing() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "data1", "read"]))
        .unwrap();

    adapter
        .update_policy("p", "p", &rule(&["bob"]), &rule(&["carol"]))
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["alice", "data1", "read"])]);
}

#[test]
fn update_policies_replaces_old_rules_with_new_ones() {
    let mut adapter = open_adapter();
    adapter
        .add_policies(
            "p",
            "p",
            &[rule(&["alice", "data1", "read"]), rule(&["bob", "data2", "write"])],
        )
        .unwrap();

    adapter
        .update_policies(
            "p",
            "p",
            &[rule(&["alice", "data1", "read"]), rule(&["bob", "data2", "write"])],
            &[rule(&["alice", "data1", "write"]), rule(&["bob", "data2", "read"])],
        )
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(
        model.policies("p", "p"),
        [rule(&["alice", "data1", "write"]), rule(&["bob", "data2", "read"])]
    );
}

#[test]
fn update_filtered_policies_returns_replaced_rules() {
    let mut adapter = open_adapter();
    adapter
        .add_policies(
            "p",
            "p",
            &[
                rule(&["alice", "data1", "read"]),
                rule(&["bob", "data1", "read"]),
                rule(&["alice", "data2", "write"]),
            ],
        )
        .unwrap();

    let replaced = adapter
        .update_filtered_policies(
            "p",
            "p",
            &[rule(&["carol", "data3", "read"])],
            0,
            &rule(&["alice"]),
        )
        .unwrap();
    assert_eq!(
        replaced,
        vec![rule(&["alice", "data1", "read"]), rule(&["alice", "data2", "write"])]
    );

    let model = load(&mut adapter);
    assert_eq!(
        model.policies("p", "p"),
        [rule(&["bob", "data1", "read"]), rule(&["carol", "data3", "read"])]
    );
}

#[test]
fn update_filtered_policies_omits_empty_fields_in_result() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "", "read"]))
        .unwrap();

    let replaced = adapter
        .update_filtered_policies("p", "p", &[], 0, &rule(&["alice"]))
        .unwrap();
    assert_eq!(replaced, vec![rule(&["alice", "read"])]);
    assert_eq!(row_count(&adapter), 0);
}

#[test]
fn interior_empty_fields_survive_a_round_trip() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "", "read"]))
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["alice", "", "read"])]);
}

#[test]
fn fields_with_commas_and_quotes_survive_a_round_trip() {
    let mut adapter = open_adapter();
    let tricky = rule(&["alice", "/api/items?ids=1,2", "say \"hi\""]);
    adapter.add_policy("p", "p", &tricky).unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [tricky]);
}

#[test]
fn trailing_whitespace_survives_a_round_trip() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["alice", "data1", "read "]))
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["alice", "data1", "read "])]);
}

#[test]
fn leading_and_blank_whitespace_survive_a_round_trip() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&[" alice", "  ", "read"]))
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&[" alice", "  ", "read"])]);
}

#[test]
fn tuple_elements_past_v5_are_not_stored() {
    let mut adapter = open_adapter();
    adapter
        .add_policy("p", "p", &rule(&["a", "b", "c", "d", "e", "f", "g", "h"]))
        .unwrap();

    let (v6, v7): (String, String) = adapter
        .client()
        .connection()
        .query_row("SELECT v6, v7 FROM casbin_rule", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!((v6.as_str(), v7.as_str()), ("", ""));

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["a", "b", "c", "d", "e", "f"])]);
}

#[test]
fn stored_v6_and_v7_are_ignored_when_loading() {
    let mut adapter = open_adapter();
    adapter
        .client()
        .connection()
        .execute_batch(
            "INSERT INTO casbin_rule (ptype, v0, v1, v6, v7) VALUES ('p', 'alice', 'data1', 'x', 'y');
             INSERT INTO casbin_rule (ptype, v6) VALUES ('p', 'only-v6');",
        )
        .unwrap();

    let model = load(&mut adapter);
    assert_eq!(model.policies("p", "p"), [rule(&["alice", "data1"])]);
    assert_eq!(model.policy_count(), 1);
}
