//! SQLite-backed node store.
//!
//! Structured rows keyed by an integer node id. The store belongs to
//! the driver thread; workers never touch it, so no locking wraps the
//! connection.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::node::{DoeNode, NO_KEY};

/// Errors raised by the node store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Key/value store of persisted tree nodes.
///
/// The root node always lives under key 1, which SQLite guarantees by
/// assigning the first inserted row that id.
pub struct DoeStore {
    conn: Connection,
}

impl DoeStore {
    /// Opens a store file, creating the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a transient in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY,
                parent INTEGER NOT NULL,
                child INTEGER NOT NULL,
                sibling INTEGER NOT NULL,
                hash INTEGER NOT NULL,
                move INTEGER NOT NULL,
                turn INTEGER NOT NULL,
                count INTEGER NOT NULL,
                score REAL NOT NULL,
                waiting INTEGER NOT NULL,
                evaluated INTEGER NOT NULL,
                terminal INTEGER NOT NULL,
                expanded INTEGER NOT NULL,
                moves BLOB NOT NULL
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Node stored under the given key, if the key resolves.
    pub fn read(&self, key: i64) -> Result<Option<DoeNode>, StoreError> {
        if key == NO_KEY {
            return Ok(None);
        }

        let node = self
            .conn
            .query_row("SELECT * FROM nodes WHERE id = ?1", params![key], row_to_node)
            .optional()?;

        Ok(node)
    }

    /// Persists a node, assigning its key on the first write.
    pub fn write(&self, node: &mut DoeNode) -> Result<(), StoreError> {
        if node.id == NO_KEY {
            self.conn.execute(
                "INSERT INTO nodes
                 (parent, child, sibling, hash, move, turn, count, score,
                  waiting, evaluated, terminal, expanded, moves)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    node.parent,
                    node.child,
                    node.sibling,
                    node.hash as i64,
                    node.mv,
                    node.turn,
                    node.count,
                    node.score,
                    node.waiting,
                    node.evaluated as i32,
                    node.terminal as i32,
                    node.expanded as i32,
                    node.encode_moves(),
                ],
            )?;

            node.id = self.conn.last_insert_rowid();
        } else {
            self.conn.execute(
                "INSERT OR REPLACE INTO nodes
                 (id, parent, child, sibling, hash, move, turn, count, score,
                  waiting, evaluated, terminal, expanded, moves)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    node.id,
                    node.parent,
                    node.child,
                    node.sibling,
                    node.hash as i64,
                    node.mv,
                    node.turn,
                    node.count,
                    node.score,
                    node.waiting,
                    node.evaluated as i32,
                    node.terminal as i32,
                    node.expanded as i32,
                    node.encode_moves(),
                ],
            )?;
        }

        Ok(())
    }

    /// All stored nodes.
    pub fn values(&self) -> Result<Vec<DoeNode>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT * FROM nodes ORDER BY id")?;
        let nodes = stmt
            .query_map([], row_to_node)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(nodes)
    }

    /// Stored nodes still awaiting their evaluation.
    pub fn unevaluated(&self) -> Result<Vec<DoeNode>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM nodes WHERE evaluated = 0 ORDER BY id")?;
        let nodes = stmt
            .query_map([], row_to_node)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(nodes)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Flushes and closes the connection.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, error)| error)?;
        Ok(())
    }
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<DoeNode> {
    Ok(DoeNode {
        id: row.get("id")?,
        parent: row.get("parent")?,
        child: row.get("child")?,
        sibling: row.get("sibling")?,
        hash: row.get::<_, i64>("hash")? as u64,
        mv: row.get("move")?,
        turn: row.get("turn")?,
        count: row.get("count")?,
        score: row.get("score")?,
        waiting: row.get("waiting")?,
        evaluated: row.get::<_, i32>("evaluated")? != 0,
        terminal: row.get::<_, i32>("terminal")? != 0,
        expanded: row.get::<_, i32>("expanded")? != 0,
        moves: DoeNode::decode_moves(&row.get::<_, Vec<u8>>("moves")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node(moves: Vec<i32>) -> DoeNode {
        let mut node = DoeNode {
            id: NO_KEY,
            parent: NO_KEY,
            child: NO_KEY,
            sibling: NO_KEY,
            hash: 0xDEAD_BEEF_DEAD_BEEF,
            mv: 4,
            turn: -1,
            count: 3,
            score: -12.5,
            waiting: 1,
            evaluated: false,
            terminal: false,
            expanded: true,
            moves,
        };

        node.update_score(2.0);
        node
    }

    #[test]
    fn first_write_assigns_key_one() {
        let store = DoeStore::open_in_memory().unwrap();
        let mut node = sample_node(vec![]);

        store.write(&mut node).unwrap();
        assert_eq!(node.id, 1);
    }

    #[test]
    fn read_write_round_trip() {
        let store = DoeStore::open_in_memory().unwrap();
        let mut node = sample_node(vec![4, 0, 8]);

        store.write(&mut node).unwrap();
        let stored = store.read(node.id).unwrap().unwrap();

        assert_eq!(stored, node);
    }

    #[test]
    fn rewrites_update_in_place() {
        let store = DoeStore::open_in_memory().unwrap();
        let mut node = sample_node(vec![1]);

        store.write(&mut node).unwrap();
        node.evaluated = true;
        node.update_score(100.0);
        store.write(&mut node).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let stored = store.read(node.id).unwrap().unwrap();
        assert!(stored.evaluated);
        assert_eq!(stored.count, node.count);
    }

    #[test]
    fn missing_keys_do_not_resolve() {
        let store = DoeStore::open_in_memory().unwrap();
        assert!(store.read(NO_KEY).unwrap().is_none());
        assert!(store.read(42).unwrap().is_none());
    }

    #[test]
    fn unevaluated_filters_finished_nodes() {
        let store = DoeStore::open_in_memory().unwrap();

        let mut pending = sample_node(vec![1]);
        let mut done = sample_node(vec![2]);
        done.evaluated = true;

        store.write(&mut pending).unwrap();
        store.write(&mut done).unwrap();

        let waiting = store.unevaluated().unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, pending.id);

        assert_eq!(store.values().unwrap().len(), 2);
    }

    #[test]
    fn store_persists_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.db");

        let mut node = sample_node(vec![4]);
        {
            let store = DoeStore::open(&path).unwrap();
            store.write(&mut node).unwrap();
            store.close().unwrap();
        }

        let store = DoeStore::open(&path).unwrap();
        assert_eq!(store.read(node.id).unwrap().unwrap(), node);
    }
}
