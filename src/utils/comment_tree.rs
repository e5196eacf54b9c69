use std::collections::HashMap;

use crate::models::comment::{Comment, CommentNode, CommentTree};

/// Builds the nested reply tree for one post.
///
/// `rows` must all belong to the same post and be sorted by `created_at`
/// ascending; they are not re-sorted here.
///
/// * Replies keep input order at every level (oldest reply first).
/// * The root list is reversed, so the newest top-level comment comes first.
/// * A reply whose parent is not among `rows` is dropped from the tree,
///   together with its own replies. It still counts towards `total`.
///
/// The tree is built with an explicit stack and `CommentNode` frees its
/// subtree iteratively, so neither step is limited by the call stack.
/// Serialization still recurses per level; new replies are capped at
/// `MAX_REPLY_DEPTH` when they are submitted.
pub fn assemble_comment_tree(rows: Vec<Comment>) -> CommentTree {
    let total = rows.len();

    let mut index_of: HashMap<i64, usize> = HashMap::with_capacity(total);
    for (idx, row) in rows.iter().enumerate() {
        index_of.insert(row.id, idx);
    }

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); total];
    for (idx, row) in rows.iter().enumerate() {
        match row.parent_id {
            None => roots.push(idx),
            Some(parent_id) => {
                if let Some(&parent) = index_of.get(&parent_id) {
                    children[parent].push(idx);
                }
            }
        }
    }

    let mut pending: Vec<Option<Comment>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = (0..total).map(|_| None).collect();

    // Post-order walk: a node is finished once all of its replies are.
    let mut stack: Vec<(usize, bool)> = roots.iter().map(|&idx| (idx, false)).collect();
    while let Some((idx, expanded)) = stack.pop() {
        if !expanded {
            stack.push((idx, true));
            stack.extend(children[idx].iter().map(|&child| (child, false)));
            continue;
        }

        let replies = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        if let Some(comment) = pending[idx].take() {
            built[idx] = Some(CommentNode { comment, replies });
        }
    }

    let mut comments: Vec<CommentNode> = roots
        .iter()
        .filter_map(|&idx| built[idx].take())
        .collect();
    comments.reverse();

    CommentTree { comments, total }
}
