mod common;

use common::{TestWorkspace, field, list, records, sheet};
use prost_reflect::{ReflectMessage, Value};

#[test]
fn id_and_name_rows_become_records() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["int32", "string"],
            &["id", "name"],
            &["ID", "Name"],
            &["1", "Alice"],
            &["", "Bob"],
        ],
    );
    let rows = records(&ws.config(), &table);
    assert_eq!(rows.len(), 2);

    assert_eq!(field(&rows[0], "id"), Value::I32(1));
    assert_eq!(field(&rows[0], "name"), Value::String("Alice".into()));

    assert!(!rows[1].has_field_by_name("id"));
    assert_eq!(field(&rows[1], "name"), Value::String("Bob".into()));
}

#[test]
fn repeated_group_skips_instances_with_default_key() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["int32", "Reward|int32", "int32", "", ""],
            &["id", "reward.id", "reward.count", "reward.id", "reward.count"],
            &["", "", "", "", ""],
            &["1", "7", "5", "0", "3"],
            &["2", "", "", "9", "1"],
            &["3", "", "", "", ""],
        ],
    );
    let rows = records(&ws.config(), &table);

    let first = list(&rows[0], "reward");
    assert_eq!(first.len(), 1);
    let reward = first[0].as_message().expect("message");
    assert_eq!(field(reward, "id"), Value::I32(7));
    assert_eq!(field(reward, "count"), Value::I32(5));

    let second = list(&rows[1], "reward");
    assert_eq!(second.len(), 1);
    assert_eq!(field(second[0].as_message().unwrap(), "id"), Value::I32(9));

    assert!(list(&rows[2], "reward").is_empty());
}

#[test]
fn nokey_group_keeps_default_key_but_drops_empty_instances() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["Reward[nokey]|int32", "int32", "", ""],
            &["reward.id", "reward.count", "reward.id", "reward.count"],
            &["", "", "", ""],
            &["0", "5", "", ""],
        ],
    );
    let rows = records(&ws.config(), &table);
    let rewards = list(&rows[0], "reward");
    assert_eq!(rewards.len(), 1);
    let reward = rewards[0].as_message().unwrap();
    assert_eq!(field(reward, "count"), Value::I32(5));
}

#[test]
fn nested_groups_repeat_at_the_inner_boundary() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["Reward|Item|int32", "int32", "", ""],
            &[
                "reward.item.id",
                "reward.item.count",
                "reward.item.id",
                "reward.item.count",
            ],
            &["", "", "", ""],
            &["1", "10", "2", "20"],
            &["1", "10", "", ""],
        ],
    );
    let rows = records(&ws.config(), &table);

    let reward = field(&rows[0], "reward");
    let reward = reward.as_message().expect("singular reward");
    let items = list(reward, "item");
    assert_eq!(items.len(), 2);
    assert_eq!(field(items[1].as_message().unwrap(), "count"), Value::I32(20));

    let reward = field(&rows[1], "reward");
    assert_eq!(list(reward.as_message().unwrap(), "item").len(), 1);
}

#[test]
fn single_column_list_splits_on_semicolons() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["int32[repeated]", "string[repeated]"],
            &["ids", "tags"],
            &["", ""],
            &["1;2;3", "fire; ice;"],
        ],
    );
    let rows = records(&ws.config(), &table);
    assert_eq!(
        list(&rows[0], "ids"),
        vec![Value::I32(1), Value::I32(2), Value::I32(3)]
    );
    assert_eq!(
        list(&rows[0], "tags"),
        vec![Value::String("fire".into()), Value::String("ice".into())]
    );
}

#[test]
fn repeated_leaf_columns_collect_non_blank_cells() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["uint32", "", "", "int32"],
            &["skill", "skill", "skill", "id"],
            &["", "", "", ""],
            &["4", "", "6", "1"],
        ],
    );
    let rows = records(&ws.config(), &table);
    assert_eq!(list(&rows[0], "skill"), vec![Value::U32(4), Value::U32(6)]);
    assert_eq!(field(&rows[0], "id"), Value::I32(1));
}

#[test]
fn date_and_hour_features_encode_seconds() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "EVENT",
        &[
            &["int32", "int64[DateTime]", "uint32[HourTime]", "int64[DateTime]"],
            &["id", "start", "daily", "end"],
            &["", "", "", ""],
            &["1", "2020-01-02 03:04:05", "01:30:00", "0"],
        ],
    );
    let rows = records(&ws.config(), &table);
    assert_eq!(field(&rows[0], "start"), Value::I64(1_577_934_245));
    assert_eq!(field(&rows[0], "daily"), Value::U32(5400));
    assert_eq!(field(&rows[0], "end"), Value::I64(0));
}

#[test]
fn float_and_text_cells_are_normalized() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["int32", "float", "string", "bool"],
            &["id", "speed", "code", "enabled"],
            &["", "", "", ""],
            &["3.0", "2.5", "100.0", "1"],
        ],
    );
    let rows = records(&ws.config(), &table);
    assert_eq!(field(&rows[0], "id"), Value::I32(3));
    assert_eq!(field(&rows[0], "speed"), Value::F32(2.5));
    assert_eq!(field(&rows[0], "code"), Value::String("100".into()));
    assert_eq!(field(&rows[0], "enabled"), Value::Bool(true));
}

#[test]
fn short_rows_leave_trailing_fields_unset() {
    let ws = TestWorkspace::new();
    let table = sheet(
        "HERO",
        &[
            &["int32", "string"],
            &["id", "name"],
            &["", ""],
            &["5"],
        ],
    );
    let rows = records(&ws.config(), &table);
    assert_eq!(field(&rows[0], "id"), Value::I32(5));
    assert!(!rows[0].has_field_by_name("name"));
}

#[test]
fn common_type_fields_are_filled_through_the_shared_message() {
    let ws = TestWorkspace::new();
    let config = ws.config_with_common(
        "syntax = \"proto2\";\npackage common;\nmessage ItemInfo {\n    optional int32 id = 1;\n    optional int32 count = 2;\n}\n",
    );
    let table = sheet(
        "SHOP",
        &[
            &["int32", "ItemInfo", ""],
            &["id", "goods.id", "goods.count"],
            &["", "", ""],
            &["7", "100", "2"],
        ],
    );
    let rows = records(&config, &table);
    let goods = field(&rows[0], "goods");
    let goods = goods.as_message().expect("goods message");
    assert_eq!(goods.descriptor().full_name(), "common.ItemInfo");
    assert_eq!(field(goods, "id"), Value::I32(100));
    assert_eq!(field(goods, "count"), Value::I32(2));
}
