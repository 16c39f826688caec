//! State synchronization: deltas, snapshots, and checksums.
//!
//! The synchronizer is game-agnostic: it sees only the state document as a
//! JSON tree and describes changes as ordered `{path, op, value}` triples.
//! Deltas go out on ticks where something changed; snapshots go out on the
//! snapshot cadence (and on demand) so clients can reconcile lost deltas.

use std::time::Instant;

use parlor_protocol::{DeltaOp, ServerEnvelope, ServerEvent};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{GameState, RoomError};

// ---------------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------------

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

/// Computes the ordered delta transforming `prev` into `next`.
///
/// Paths are dotted/indexed and rooted at the state document. Arrays that
/// only grew at the tail become `push` ops; arrays that changed length any
/// other way become a single `splice` from the first differing index.
pub fn diff(prev: &Value, next: &Value) -> Vec<DeltaOp> {
    let mut ops = Vec::new();
    diff_into(prev, next, "", &mut ops);
    ops
}

fn diff_into(prev: &Value, next: &Value, path: &str, ops: &mut Vec<DeltaOp>) {
    match (prev, next) {
        (Value::Object(p), Value::Object(n)) => {
            for key in p.keys() {
                if !n.contains_key(key) {
                    ops.push(DeltaOp::Delete {
                        path: join_path(path, key),
                    });
                }
            }
            for (key, next_val) in n {
                match p.get(key) {
                    Some(prev_val) => {
                        diff_into(prev_val, next_val, &join_path(path, key), ops)
                    }
                    None => ops.push(DeltaOp::Set {
                        path: join_path(path, key),
                        value: next_val.clone(),
                    }),
                }
            }
        }
        (Value::Array(p), Value::Array(n)) => {
            if n.len() > p.len() && n[..p.len()] == p[..] {
                for item in &n[p.len()..] {
                    ops.push(DeltaOp::Push {
                        path: path.to_string(),
                        value: item.clone(),
                    });
                }
            } else if n.len() == p.len() {
                for (i, (pv, nv)) in p.iter().zip(n).enumerate() {
                    diff_into(pv, nv, &join_path(path, &i.to_string()), ops);
                }
            } else {
                let start = p
                    .iter()
                    .zip(n.iter())
                    .position(|(a, b)| a != b)
                    .unwrap_or_else(|| p.len().min(n.len()));
                ops.push(DeltaOp::Splice {
                    path: path.to_string(),
                    start,
                    delete_count: p.len() - start,
                    items: n[start..].to_vec(),
                });
            }
        }
        (p, n) => {
            if p != n {
                ops.push(DeltaOp::Set {
                    path: path.to_string(),
                    value: n.clone(),
                });
            }
        }
    }
}

/// Applies a delta to a document — the client-side half of [`diff`], used
/// by tests and SDKs to prove reconstruction matches the server.
pub fn apply_delta(doc: &mut Value, ops: &[DeltaOp]) -> Result<(), RoomError> {
    for op in ops {
        apply_one(doc, op)
            .ok_or_else(|| RoomError::Validation(format!("bad delta path {:?}", op.path())))?;
    }
    Ok(())
}

fn navigate<'a>(doc: &'a mut Value, parts: &[&str]) -> Option<&'a mut Value> {
    let mut cur = doc;
    for part in parts {
        cur = match cur {
            Value::Object(map) => map.get_mut(*part)?,
            Value::Array(arr) => arr.get_mut(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

fn apply_one(doc: &mut Value, op: &DeltaOp) -> Option<()> {
    let path = op.path();
    let parts: Vec<&str> = if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    };

    match op {
        DeltaOp::Set { value, .. } => {
            if parts.is_empty() {
                *doc = value.clone();
                return Some(());
            }
            let (key, parent_parts) = parts.split_last()?;
            let parent = navigate(doc, parent_parts)?;
            match parent {
                Value::Object(map) => {
                    map.insert((*key).to_string(), value.clone());
                }
                Value::Array(arr) => {
                    let idx = key.parse::<usize>().ok()?;
                    if idx < arr.len() {
                        arr[idx] = value.clone();
                    } else if idx == arr.len() {
                        arr.push(value.clone());
                    } else {
                        return None;
                    }
                }
                _ => return None,
            }
            Some(())
        }
        DeltaOp::Delete { .. } => {
            let (key, parent_parts) = parts.split_last()?;
            let parent = navigate(doc, parent_parts)?;
            match parent {
                Value::Object(map) => {
                    map.remove(*key);
                }
                Value::Array(arr) => {
                    let idx = key.parse::<usize>().ok()?;
                    if idx >= arr.len() {
                        return None;
                    }
                    arr.remove(idx);
                }
                _ => return None,
            }
            Some(())
        }
        DeltaOp::Push { value, .. } => {
            let target = navigate(doc, &parts)?;
            target.as_array_mut()?.push(value.clone());
            Some(())
        }
        DeltaOp::Splice {
            start,
            delete_count,
            items,
            ..
        } => {
            let target = navigate(doc, &parts)?;
            let arr = target.as_array_mut()?;
            if *start > arr.len() || start + delete_count > arr.len() {
                return None;
            }
            arr.splice(*start..*start + *delete_count, items.iter().cloned());
            Some(())
        }
    }
}

/// SHA-256 of the canonical JSON encoding, hex-encoded.
///
/// `serde_json` maps are key-sorted, so equal documents always hash equal.
pub fn checksum(value: &Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Per-room state synchronizer.
pub struct StateSynchronizer {
    /// Host start instant; `server_time` is milliseconds since this.
    epoch: Instant,
    /// The document as last sent to clients.
    last_emitted: Option<Value>,
    /// Set when a command applied since the last emit.
    dirty: bool,
}

impl StateSynchronizer {
    pub fn new(epoch: Instant) -> Self {
        Self {
            epoch,
            last_emitted: None,
            dirty: false,
        }
    }

    pub fn server_time(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Flags that the state changed since the last emit.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Forgets the emit baseline (game detached / round torn down).
    pub fn reset(&mut self) {
        self.last_emitted = None;
        self.dirty = false;
    }

    /// Produces a delta envelope if anything changed since the last emit.
    ///
    /// Returns `None` when clean, when the delta is empty, or before any
    /// snapshot established a baseline.
    pub fn delta(&mut self, state: &GameState, tick: u64) -> Option<ServerEnvelope> {
        if !self.dirty {
            return None;
        }
        let baseline = self.last_emitted.as_ref()?;
        let ops = diff(baseline, state.doc());
        self.dirty = false;
        if ops.is_empty() {
            return None;
        }
        self.last_emitted = Some(state.doc().clone());
        Some(ServerEnvelope {
            version: state.version(),
            tick,
            server_time: self.server_time(),
            payload: ServerEvent::GameStateUpdate { ops },
        })
    }

    /// Produces a full snapshot envelope and resets the delta baseline.
    pub fn snapshot(&mut self, state: &GameState, tick: u64) -> ServerEnvelope {
        self.last_emitted = Some(state.doc().clone());
        self.dirty = false;
        ServerEnvelope {
            version: state.version(),
            tick,
            server_time: self.server_time(),
            payload: ServerEvent::GameStateSnapshot {
                state: state.doc().clone(),
                checksum: Some(checksum(state.doc())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_diff_scalar_change_is_set() {
        let ops = diff(&json!({"a": 1}), &json!({"a": 2}));
        assert_eq!(
            ops,
            vec![DeltaOp::Set {
                path: "a".into(),
                value: json!(2)
            }]
        );
    }

    #[test]
    fn test_diff_nested_path() {
        let ops = diff(
            &json!({"board": [["X", null]], "phase": "p"}),
            &json!({"board": [["X", "O"]], "phase": "p"}),
        );
        assert_eq!(
            ops,
            vec![DeltaOp::Set {
                path: "board.0.1".into(),
                value: json!("O")
            }]
        );
    }

    #[test]
    fn test_diff_removed_key_is_delete() {
        let ops = diff(&json!({"a": 1, "b": 2}), &json!({"a": 1}));
        assert_eq!(ops, vec![DeltaOp::Delete { path: "b".into() }]);
    }

    #[test]
    fn test_diff_appended_items_are_pushes() {
        let ops = diff(&json!({"log": [1]}), &json!({"log": [1, 2, 3]}));
        assert_eq!(
            ops,
            vec![
                DeltaOp::Push {
                    path: "log".into(),
                    value: json!(2)
                },
                DeltaOp::Push {
                    path: "log".into(),
                    value: json!(3)
                },
            ]
        );
    }

    #[test]
    fn test_diff_shrunk_array_is_splice() {
        let ops = diff(&json!({"deck": [1, 2, 3, 4]}), &json!({"deck": [1, 2]}));
        assert_eq!(
            ops,
            vec![DeltaOp::Splice {
                path: "deck".into(),
                start: 2,
                delete_count: 2,
                items: vec![],
            }]
        );
    }

    #[test]
    fn test_diff_identical_docs_is_empty() {
        let doc = json!({"a": {"b": [1, 2]}});
        assert!(diff(&doc, &doc).is_empty());
    }

    #[test]
    fn test_apply_delta_reconstructs_server_doc() {
        let cases = [
            (json!({"a": 1, "b": {"c": [1, 2]}}), json!({"a": 2, "b": {"c": [1, 2, 3]}})),
            (json!({"x": [1, 2, 3]}), json!({"x": [9]})),
            (json!({"k": "v", "gone": true}), json!({"k": "v2"})),
            (json!({"deep": {"arr": [{"n": 1}]}}), json!({"deep": {"arr": [{"n": 5}]}})),
        ];
        for (prev, next) in cases {
            let ops = diff(&prev, &next);
            let mut reconstructed = prev.clone();
            apply_delta(&mut reconstructed, &ops).unwrap();
            assert_eq!(reconstructed, next, "ops: {ops:?}");
        }
    }

    #[test]
    fn test_checksum_stable_and_content_addressed() {
        let a = json!({"z": 1, "a": 2});
        let b = json!({"a": 2, "z": 1});
        assert_eq!(checksum(&a), checksum(&b), "key order must not matter");
        assert_ne!(checksum(&a), checksum(&json!({"a": 2, "z": 2})));
        assert_eq!(checksum(&a).len(), 64);
    }

    #[test]
    fn test_synchronizer_delta_needs_baseline_and_dirt() {
        let mut sync = StateSynchronizer::new(Instant::now());
        let state = GameState::new(json!({"phase": "p"}));

        // No baseline yet: nothing to delta against.
        sync.mark_dirty();
        assert!(sync.delta(&state, 1).is_none());

        // Snapshot establishes the baseline.
        let snap = sync.snapshot(&state, 1);
        assert!(matches!(
            snap.payload,
            ServerEvent::GameStateSnapshot { .. }
        ));

        // Clean state: no delta.
        assert!(sync.delta(&state, 2).is_none());
    }

    #[test]
    fn test_synchronizer_emits_delta_after_change() {
        let mut sync = StateSynchronizer::new(Instant::now());
        let mut state = GameState::new(json!({"phase": "a"}));
        sync.snapshot(&state, 1);

        state.replace(json!({"phase": "b"}));
        sync.mark_dirty();
        let env = sync.delta(&state, 2).expect("delta expected");
        assert_eq!(env.version, state.version());
        assert_eq!(env.tick, 2);
        match env.payload {
            ServerEvent::GameStateUpdate { ops } => {
                assert_eq!(ops.len(), 1);
                assert_eq!(ops[0].path(), "phase");
            }
            other => panic!("expected delta, got {other:?}"),
        }

        // A second tick with no further change is quiet.
        assert!(sync.delta(&state, 3).is_none());
    }

    #[test]
    fn test_dirty_but_equal_doc_suppressed() {
        let mut sync = StateSynchronizer::new(Instant::now());
        let state = GameState::new(json!({"phase": "a"}));
        sync.snapshot(&state, 1);
        sync.mark_dirty();
        assert!(sync.delta(&state, 2).is_none(), "empty delta suppressed");
    }
}
