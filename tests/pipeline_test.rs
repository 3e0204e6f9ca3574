//! End-to-end tests of the library pipeline: catalog -> build -> extract.

use schema_cycles::catalog::{AuditFilter, Catalog, DumpCatalog, ForeignKeyRef, InMemoryCatalog};
use schema_cycles::graph::{
    build, build_from_catalog, cyclic_components, extract_cycles, is_cyclic, self_references,
    simple_cycles,
};
use schema_cycles::Error;
use std::collections::BTreeSet;

const SHOP_SCHEMA: &str = r#"
-- users and teams reference each other
CREATE TABLE users (
  id INT PRIMARY KEY,
  team_id INT
);

CREATE TABLE teams (
  id INT PRIMARY KEY,
  owner_id INT REFERENCES users(id)
);

ALTER TABLE users ADD CONSTRAINT fk_team FOREIGN KEY (team_id) REFERENCES teams(id);

CREATE TABLE orders (
  id INT PRIMARY KEY,
  user_id INT,
  invoice_id INT,
  FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE invoices (
  id INT PRIMARY KEY,
  order_id INT REFERENCES orders(id)
);

ALTER TABLE orders ADD FOREIGN KEY (invoice_id) REFERENCES invoices(id);

CREATE TABLE categories (
  id INT PRIMARY KEY,
  parent_id INT REFERENCES categories(id)
);

CREATE TABLE orders_aud (
  id INT,
  rev INT,
  user_id INT REFERENCES users(id)
);

CREATE TABLE notes (
  id INT PRIMARY KEY,
  order_rev INT REFERENCES orders_aud(id)
);

INSERT INTO users (id, team_id) VALUES (1, NULL);
"#;

fn shop_catalog() -> DumpCatalog {
    DumpCatalog::from_reader(SHOP_SCHEMA.as_bytes(), AuditFilter::default(), None).unwrap()
}

fn names<'a>(items: impl IntoIterator<Item = &'a str>) -> BTreeSet<&'a str> {
    items.into_iter().collect()
}

#[test]
fn test_dump_to_cycle_graph() {
    let graphs = build_from_catalog(&shop_catalog()).unwrap();
    let cycles = extract_cycles(&graphs.dag);

    assert_eq!(
        cycles.node_set(),
        names(["users", "teams", "orders", "invoices"])
    );
    assert_eq!(
        cycles.edge_set(),
        [
            ("users", "teams"),
            ("teams", "users"),
            ("orders", "invoices"),
            ("invoices", "orders"),
        ]
        .into_iter()
        .collect::<BTreeSet<_>>()
    );
}

#[test]
fn test_every_discovered_table_is_a_node() {
    let graphs = build_from_catalog(&shop_catalog()).unwrap();

    let expected = names(["users", "teams", "orders", "invoices", "categories", "notes"]);
    assert_eq!(graphs.full.node_set(), expected);
    assert_eq!(graphs.dag.node_set(), expected);
    assert_eq!(graphs.stats.tables, 6);
}

#[test]
fn test_audit_tables_never_become_nodes() {
    let graphs = build_from_catalog(&shop_catalog()).unwrap();

    assert!(!graphs.full.contains_node("orders_aud"));
    assert_eq!(graphs.stats.dropped_edges, 1);
    assert_eq!(graphs.full.edge_count(), 6);
}

#[test]
fn test_self_reference_only_in_full_graph() {
    let graphs = build_from_catalog(&shop_catalog()).unwrap();

    assert!(graphs.full.contains_edge("categories", "categories"));
    assert!(!graphs.dag.contains_edge("categories", "categories"));
    assert_eq!(self_references(&graphs.full), vec!["categories"]);
    assert!(!extract_cycles(&graphs.dag).contains_node("categories"));
}

#[test]
fn test_cycles_are_listed_in_stable_order() {
    let graphs = build_from_catalog(&shop_catalog()).unwrap();
    let cycles: Vec<String> = simple_cycles(&graphs.dag)
        .iter()
        .map(|c| c.display())
        .collect();

    assert_eq!(
        cycles,
        vec!["invoices -> orders -> invoices", "teams -> users -> teams"]
    );
}

#[test]
fn test_build_twice_is_set_equal() {
    let catalog = shop_catalog();
    let first = build_from_catalog(&catalog).unwrap();
    let second = build_from_catalog(&catalog).unwrap();

    assert_eq!(first.full, second.full);
    assert_eq!(first.dag, second.dag);
    assert_eq!(extract_cycles(&first.dag), extract_cycles(&second.dag));
}

#[test]
fn test_scc_fast_path_agrees() {
    let graphs = build_from_catalog(&shop_catalog()).unwrap();

    assert!(is_cyclic(&graphs.dag));
    assert_eq!(
        cyclic_components(&graphs.dag),
        vec![vec!["invoices", "orders"], vec!["teams", "users"]]
    );
}

#[test]
fn test_acyclic_schema_gives_empty_cycle_graph() {
    let mut catalog = InMemoryCatalog::new(AuditFilter::default());
    catalog.add_table("users");
    catalog.add_foreign_key("orders", ForeignKeyRef::new("user_id", "users", "id"));
    catalog.add_foreign_key("order_items", ForeignKeyRef::new("order_id", "orders", "id"));

    let graphs = build_from_catalog(&catalog).unwrap();
    let cycles = extract_cycles(&graphs.dag);

    assert!(cycles.is_empty());
    assert!(!is_cyclic(&graphs.dag));
    assert_eq!(graphs.full.node_count(), 3);
}

#[test]
fn test_failing_table_aborts_build() {
    let tables = ["users", "orders", "invoices"];
    let result = build(&tables, |table| {
        if table == "orders" {
            Err("permission denied for table orders".into())
        } else {
            Ok(Vec::new())
        }
    });

    let err = result.unwrap_err();
    assert!(matches!(err, Error::CatalogQuery { .. }));
    assert_eq!(err.failed_table(), Some("orders"));
}

#[test]
fn test_schema_filter_on_qualified_dump() {
    let sql = "CREATE TABLE public.a (id INT, b_id INT REFERENCES public.b(id));
               CREATE TABLE public.b (id INT, a_id INT REFERENCES public.a(id));
               CREATE TABLE archive.c (id INT, a_id INT REFERENCES public.a(id));";

    let catalog = DumpCatalog::from_reader(sql.as_bytes(), AuditFilter::default(), Some("public"))
        .unwrap();
    assert_eq!(catalog.list_tables().unwrap(), vec!["a", "b"]);

    let graphs = build_from_catalog(&catalog).unwrap();
    assert_eq!(extract_cycles(&graphs.dag).node_count(), 2);
}
