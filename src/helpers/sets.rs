//! Set operations over lists of simple values.
//!
//! Membership is decided by the string form of each item, so `1` and `"1"`
//! are the same member. Nested arrays and objects are compared the same way,
//! which is only meaningful for simple data.

use std::collections::HashSet;

use super::{HelperDef, HelperRegistry, arg};
use crate::operators;
use crate::value::{TypeTag, Value};

pub(super) fn register(registry: &mut HelperRegistry) {
    registry.register(
        HelperDef::new("union")
            .alias("u")
            .alias("∪")
            .on(TypeTag::Array, |_, args| {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for item in args.iter().flat_map(members) {
                    if seen.insert(item.as_string()) {
                        out.push(item.clone());
                    }
                }
                Ok(Value::Array(out))
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "union( $list_a $list_b )",
                "A new list with the items of both lists",
                "Returns every item from both lists, in order of first appearance, with \
                 duplicates removed.",
            ),
    );

    registry.register(
        HelperDef::new("intersection")
            .alias("n")
            .alias("∩")
            .on(TypeTag::Array, |_, args| {
                let found = keys(arg(&args, 0));
                let out = members(arg(&args, 1))
                    .filter(|item| found.contains(&item.as_string()))
                    .cloned()
                    .collect();
                Ok(Value::Array(out))
            })
            .coerce(&[TypeTag::Array])
            .handles_decimals()
            .meta(
                "intersection( $list_a $list_b )",
                "The items that are on both lists",
                "Returns the items of $list_b that also appear on $list_a.",
            ),
    );

    registry.register(
        HelperDef::new("difference")
            .alias("diff")
            .alias("\\")
            .alias("∖")
            .on(TypeTag::Array, |_, args| {
                let excluded = keys(arg(&args, 1));
                let out = members(arg(&args, 0))
                    .filter(|item| !excluded.contains(&item.as_string()))
                    .cloned()
                    .collect();
                Ok(Value::Array(out))
            })
            .any(|_, _| Ok(Value::Array(Vec::new())))
            .handles_decimals()
            .meta(
                "difference( $list_a $list_b )",
                "The items of $list_a that are not on $list_b",
                "Returns the set difference: every item of $list_a missing from $list_b.",
            ),
    );

    registry.register(
        HelperDef::new("member")
            .alias("E")
            .alias("∈")
            .on(TypeTag::Array, |ctx, args| {
                let wanted = arg(&args, 1);
                let found = members(arg(&args, 0))
                    .any(|item| operators::equals(item, wanted, ctx.numeric_mode()));
                Ok(Value::Boolean(found))
            })
            .coerce(&[TypeTag::Array])
            .meta(
                "member( $list $item )",
                "Whether $item is on $list",
                "Returns true when $item equals one of the items of $list.",
            ),
    );

    registry.register(
        HelperDef::new("subset")
            .alias("c")
            .alias("⊂")
            .alias("⊆")
            .on(TypeTag::Array, |_, args| {
                let found = keys(arg(&args, 0));
                let contained = members(arg(&args, 1)).all(|item| found.contains(&item.as_string()));
                Ok(Value::Boolean(contained))
            })
            .coerce(&[TypeTag::Array])
            .meta(
                "subset( $list_a $list_b )",
                "Whether $list_b is a subset of $list_a",
                "Returns true when every item of $list_b is also on $list_a.",
            ),
    );
}

/// Items of a list argument. A missing list is empty and a single value is
/// a list of one.
fn members(list: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match list {
        Value::Array(items) => Box::new(items.iter()),
        Value::Undefined | Value::Null => Box::new(std::iter::empty()),
        single => Box::new(std::iter::once(single)),
    }
}

fn keys(list: &Value) -> HashSet<String> {
    members(list).map(Value::as_string).collect()
}
