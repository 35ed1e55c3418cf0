//! End-to-end scenarios from `§8 TESTABLE PROPERTIES`, run against
//! `store::memory::MemoryStore`.

use rule_solver::diagnostics::NullSink;
use rule_solver::store::memory::MemoryStore;
use rule_solver::{Identifier, Rule, Term};

fn lit(e: u64) -> Identifier {
    Identifier::literal(e)
}

fn var(name: &str) -> Identifier {
    Identifier::variable(name)
}

fn collect_this(rule: &Rule, store: &MemoryStore) -> Vec<u64> {
    let this_slot = rule.find_variable(".").unwrap();
    let mut iter = rule.iter(store);
    let mut out = Vec::new();
    while iter.next().unwrap() {
        out.push(iter.variable(this_slot).unwrap());
    }
    out.sort_unstable();
    out
}

/// #1 — `Food(.)` over `a,b,c: Food`, `d: Toy`.
#[test]
fn scenario_1_unary_component_query() {
    let mut store = MemoryStore::new();
    let food = store.entity("Food");
    let toy = store.entity("Toy");
    let a = store.entity("a");
    let b = store.entity("b");
    let c = store.entity("c");
    let d = store.entity("d");
    store.add(a, food);
    store.add(b, food);
    store.add(c, food);
    store.add(d, toy);

    let terms = vec![Term::unary(lit(food), var("."))];
    let rule = Rule::new("Food(.)", &terms, &store, &NullSink).unwrap();

    let mut expect = vec![a, b, c];
    expect.sort_unstable();
    assert_eq!(collect_this(&rule, &store), expect);
}

/// #2 — non-transitive `ChildOf(., carol)` only yields the direct parent.
#[test]
fn scenario_2_non_transitive_pair_query() {
    let mut store = MemoryStore::new();
    let child_of = store.entity("ChildOf");
    let alice = store.entity("alice");
    let bob = store.entity("bob");
    let carol = store.entity("carol");
    store.add_pair(alice, child_of, bob);
    store.add_pair(bob, child_of, carol);

    let terms = vec![Term::binary(lit(child_of), var("."), lit(carol))];
    let rule = Rule::new("ChildOf(., carol)", &terms, &store, &NullSink).unwrap();

    assert_eq!(collect_this(&rule, &store), vec![bob]);
}

/// #3 — the same store, but `ChildOf` is Transitive: both the direct
/// parent and the grandparent must be yielded (`§8` invariant 6).
#[test]
fn scenario_3_transitive_pair_query() {
    let mut store = MemoryStore::new();
    let child_of = store.entity("ChildOf");
    let alice = store.entity("alice");
    let bob = store.entity("bob");
    let carol = store.entity("carol");
    store.mark_transitive(child_of);
    store.add_pair(alice, child_of, bob);
    store.add_pair(bob, child_of, carol);

    let terms = vec![Term::binary(lit(child_of), var("."), lit(carol))];
    let rule = Rule::new("ChildOf(., carol)", &terms, &store, &NullSink).unwrap();

    let mut expect = vec![alice, bob];
    expect.sort_unstable();
    assert_eq!(collect_this(&rule, &store), expect);
}

/// #4 — `Likes(., .)`, same variable in both lanes: only entries whose
/// lanes are equal match (`§8` invariant 5).
#[test]
fn scenario_4_same_variable_in_both_lanes() {
    let mut store = MemoryStore::new();
    let likes = store.entity("Likes");
    let alice = store.entity("alice");
    let bob = store.entity("bob");
    let carol = store.entity("carol");
    store.add_pair(alice, likes, bob);
    store.add_pair(bob, likes, alice);
    store.add_pair(carol, likes, carol);

    let terms = vec![Term::binary(lit(likes), var("."), var("."))];
    let rule = Rule::new("Likes(., .)", &terms, &store, &NullSink).unwrap();

    assert_eq!(collect_this(&rule, &store), vec![carol]);
}

/// #5 — `Eats(., X)`: every matching pair, in table-major order.
#[test]
fn scenario_5_table_major_pair_order() {
    let mut store = MemoryStore::new();
    let eats = store.entity("Eats");
    let alice = store.entity("alice");
    let bob = store.entity("bob");
    let apple = store.entity("apple");
    let pear = store.entity("pear");
    store.add_pair(alice, eats, apple);
    store.add_pair(bob, eats, apple);
    store.add_pair(bob, eats, pear);

    let terms = vec![Term::binary(lit(eats), var("."), var("X"))];
    let rule = Rule::new("Eats(., X)", &terms, &store, &NullSink).unwrap();
    let this_slot = rule.find_variable(".").unwrap();
    let x_slot = rule.find_variable("X").unwrap();

    let mut iter = rule.iter(&store);
    let mut pairs = Vec::new();
    while iter.next().unwrap() {
        pairs.push((
            iter.variable(this_slot).unwrap(),
            iter.variable(x_slot).unwrap(),
        ));
    }

    let mut expect = vec![(alice, apple), (bob, apple), (bob, pear)];
    pairs.sort_unstable();
    expect.sort_unstable();
    assert_eq!(pairs, expect);
}

/// #6 — an empty store yields nothing, and the very first `next()` call
/// returns `false`.
#[test]
fn scenario_6_empty_store_yields_nothing() {
    let store = MemoryStore::new();
    let terms = vec![Term::unary(lit(1), var("."))];
    let rule = Rule::new("Missing(.)", &terms, &store, &NullSink).unwrap();

    let mut iter = rule.iter(&store);
    assert!(!iter.next().unwrap());
}

/// Invariant 4 — a ground rule with no variables yields exactly one
/// match when the fact holds, and none when it doesn't.
#[test]
fn ground_rule_yields_at_most_one_match() {
    let mut store = MemoryStore::new();
    let food = store.entity("Food");
    let alice = store.entity("alice");
    store.add(alice, food);

    let terms = vec![Term::unary(lit(food), lit(alice))];
    let rule = Rule::new("Food(alice)", &terms, &store, &NullSink).unwrap();
    let mut iter = rule.iter(&store);
    assert!(iter.next().unwrap());
    assert!(!iter.next().unwrap());

    let bob = store.entity("bob");
    let terms = vec![Term::unary(lit(food), lit(bob))];
    let rule = Rule::new("Food(bob)", &terms, &store, &NullSink).unwrap();
    let mut iter = rule.iter(&store);
    assert!(!iter.next().unwrap());
}

/// Invariant 2 — no assignment is yielded twice, across a less trivial
/// multi-term rule.
#[test]
fn uniqueness_across_terms() {
    let mut store = MemoryStore::new();
    let food = store.entity("Food");
    let tasty = store.entity("Tasty");
    let apple = store.entity("apple");
    let pear = store.entity("pear");
    store.add(apple, food);
    store.add(apple, tasty);
    store.add(pear, food);

    let terms = vec![
        Term::unary(lit(food), var(".")),
        Term::unary(lit(tasty), var(".")),
    ];
    let rule = Rule::new("Food(.), Tasty(.)", &terms, &store, &NullSink).unwrap();
    let seen = collect_this(&rule, &store);
    assert_eq!(seen, vec![apple]);
}
