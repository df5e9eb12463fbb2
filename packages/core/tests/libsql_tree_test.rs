//! Integration tests for TreeIndex over LibsqlStore
//!
//! Tests cover:
//! - Building a tree through the engine on a SQLite file
//! - Moves within and across scopes
//! - Subtree deletion and compensation on rejected inserts
//! - Rebuilding and reopening a database
//! - Two handles on one database file

use anyhow::Result;
use nestedset_core::{
    behaviors::PayloadIsObject,
    check_all,
    config::TreeConfig,
    db::{LibsqlStore, NodeRepository, SortDirection},
    models::TreeNode,
    operations::{TreeError, TreeIndex},
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Test helper: Route engine logs to the test output when RUST_LOG is set
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test helper: Create a tree on a fresh database file
async fn create_test_tree() -> Result<(TreeIndex, Arc<LibsqlStore>, TempDir)> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("tree.db");
    let store = Arc::new(LibsqlStore::open(db_path, TreeConfig::default()).await?);
    let tree = TreeIndex::new(store.clone());

    Ok((tree, store, temp_dir))
}

fn node(name: &str) -> TreeNode {
    TreeNode::new(json!({ "name": name }))
}

/// Test helper: root [1,10] with D [2,3] and the chain A > B > C
async fn build_five_nodes(tree: &TreeIndex) -> Result<[TreeNode; 5]> {
    let root = tree.make_root(node("root"), None).await?;
    let a = tree.insert_as_last_child(node("A"), &root).await?;
    let d = tree.insert_as_prev_sibling(node("D"), &a).await?;
    let b = tree.insert_as_first_child(node("B"), &a).await?;
    let c = tree.insert_as_first_child(node("C"), &b).await?;

    Ok([
        tree.reload(&root).await?,
        tree.reload(&d).await?,
        tree.reload(&a).await?,
        tree.reload(&b).await?,
        tree.reload(&c).await?,
    ])
}

async fn assert_intact(store: &LibsqlStore) -> Result<()> {
    let violations = check_all(store).await?;
    assert!(violations.is_empty(), "violations: {:?}", violations);
    Ok(())
}

fn bounds(node: &TreeNode) -> (i64, i64, i64) {
    (node.left, node.right, node.level)
}

// =========================================================================
// Construction Tests
// =========================================================================

#[tokio::test]
async fn test_build_five_node_tree() -> Result<()> {
    let (tree, store, _temp_dir) = create_test_tree().await?;

    let [root, d, a, b, c] = build_five_nodes(&tree).await?;

    assert_eq!(bounds(&root), (1, 10, 1));
    assert_eq!(bounds(&d), (2, 3, 2));
    assert_eq!(bounds(&a), (4, 9, 2));
    assert_eq!(bounds(&b), (5, 8, 3));
    assert_eq!(bounds(&c), (6, 7, 4));
    assert_eq!(c.parent_id, b.id);
    assert_eq!(d.parent_id, root.id);
    assert_eq!(c.payload["name"], "C");
    assert_intact(&store).await?;

    Ok(())
}

#[tokio::test]
async fn test_insert_first_child_shifts_followers() -> Result<()> {
    let (tree, store, _temp_dir) = create_test_tree().await?;
    let [_, _, a, b, _] = build_five_nodes(&tree).await?;

    let child = tree.insert_as_first_child(node("new"), &a).await?;

    assert_eq!((child.left, child.right), (5, 6));
    assert_eq!(tree.reload(&a).await?.right, 11);
    assert_eq!(tree.reload(&b).await?.left, 7);
    assert_intact(&store).await?;

    Ok(())
}

#[tokio::test]
async fn test_rejected_insert_closes_gap() -> Result<()> {
    let (tree, store, _temp_dir) = create_test_tree().await?;
    let [root, ..] = build_five_nodes(&tree).await?;
    let tree = tree.with_validator(PayloadIsObject);

    let result = tree
        .insert_as_last_child(TreeNode::new(json!("not an object")), &root)
        .await;

    assert!(matches!(result, Err(TreeError::ValidationFailure(_))));
    assert_eq!(tree.reload(&root).await?.right, 10);
    assert_eq!(store.count(&Default::default()).await?, 5);
    assert_intact(&store).await?;

    Ok(())
}

// =========================================================================
// Move and Delete Tests
// =========================================================================

#[tokio::test]
async fn test_moves_within_scope() -> Result<()> {
    let (tree, store, _temp_dir) = create_test_tree().await?;
    let [root, d, a, _, c] = build_five_nodes(&tree).await?;

    let moved = tree.move_to_next_sibling(&c, &a).await?;
    assert_eq!(bounds(&moved), (8, 9, 2));
    assert_eq!(moved.parent_id, root.id);

    let moved = tree.move_to_first_child(&d, &moved).await?;
    assert_eq!(bounds(&moved), (7, 8, 3));
    assert_eq!(moved.parent_id, c.id);
    assert_intact(&store).await?;

    Ok(())
}

#[tokio::test]
async fn test_move_subtree_across_scopes() -> Result<()> {
    let (tree, store, _temp_dir) = create_test_tree().await?;
    let [root, d, a, b, c] = build_five_nodes(&tree).await?;
    let e = tree.make_root(node("E"), None).await?;
    assert_eq!(e.scope, 2);

    let roots = tree.roots().all().await?;
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].id, root.id);
    assert_eq!(roots[1].id, e.id);

    tree.move_to_last_child(&a, &e).await?;

    assert_eq!(bounds(&tree.reload(&e).await?), (1, 8, 1));
    let a = tree.reload(&a).await?;
    assert_eq!((a.left, a.right, a.level, a.scope), (2, 7, 2, 2));
    assert_eq!(tree.reload(&b).await?.scope, 2);
    assert_eq!(bounds(&tree.reload(&c).await?), (4, 5, 4));

    assert_eq!(bounds(&tree.reload(&root).await?), (1, 4, 1));
    assert_eq!(bounds(&tree.reload(&d).await?), (2, 3, 2));
    assert_intact(&store).await?;

    Ok(())
}

#[tokio::test]
async fn test_delete_subtree() -> Result<()> {
    let (tree, store, _temp_dir) = create_test_tree().await?;
    let [root, _, a, b, c] = build_five_nodes(&tree).await?;

    assert_eq!(tree.delete(&b).await?, 2);

    assert_eq!(tree.reload(&root).await?.right, 6);
    assert_eq!(bounds(&tree.reload(&a).await?), (4, 5, 2));
    assert!(matches!(
        tree.reload(&c).await,
        Err(TreeError::NotFound { .. })
    ));
    assert_intact(&store).await?;

    Ok(())
}

// =========================================================================
// Navigation and Repair Tests
// =========================================================================

#[tokio::test]
async fn test_navigation_against_sql() -> Result<()> {
    let (tree, _store, _temp_dir) = create_test_tree().await?;
    let [root, d, a, b, c] = build_five_nodes(&tree).await?;

    let children = tree
        .children(&root, false, SortDirection::Ascending, None)
        .await?
        .ids()
        .await?;
    assert_eq!(children, vec![d.id.unwrap(), a.id.unwrap()]);

    let leaves = tree
        .leaves(&root, false, SortDirection::Descending)
        .await?
        .ids()
        .await?;
    assert_eq!(leaves, vec![c.id.unwrap(), d.id.unwrap()]);

    let siblings = tree.siblings(&d, false, SortDirection::Ascending).await?;
    assert_eq!(siblings.ids().await?, vec![a.id.unwrap()]);

    assert_eq!(tree.parent(&c).await?.and_then(|n| n.id), b.id);
    assert!(tree.is_in_parents(&a, &c, true).await?);

    Ok(())
}

#[tokio::test]
async fn test_rebuild_and_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("tree.db");

    let root_id = {
        let store = Arc::new(LibsqlStore::open(db_path.clone(), TreeConfig::default()).await?);
        let tree = TreeIndex::new(store);
        let [root, ..] = build_five_nodes(&tree).await?;
        root.id.unwrap()
    };

    let store = Arc::new(LibsqlStore::open(db_path, TreeConfig::default()).await?);
    let tree = TreeIndex::new(store.clone());

    assert_eq!(tree.rebuild_tree(root_id, 1).await?, 11);
    assert_eq!(tree.fulltree(Some(1)).count().await?, 5);
    assert_intact(&store).await?;

    Ok(())
}

// =========================================================================
// Concurrency Tests
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_handles_on_one_file_serialize_inserts() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("tree.db");

    let first = Arc::new(LibsqlStore::open(db_path.clone(), TreeConfig::default()).await?);
    let second = Arc::new(LibsqlStore::open(db_path, TreeConfig::default()).await?);
    let trees = [TreeIndex::new(first.clone()), TreeIndex::new(second)];

    let root = trees[0].make_root(node("root"), None).await?;
    let root_id = root.id.unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let tree = trees[i % 2].clone();
        handles.push(tokio::spawn(async move {
            tree.insert_as_first_child(node(&format!("child {}", i)), root_id)
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let root = trees[1].reload(root_id).await?;
    assert_eq!((root.left, root.right), (1, 82));
    assert_eq!(trees[0].fulltree(Some(1)).count().await?, 41);
    assert_intact(&first).await?;

    Ok(())
}
