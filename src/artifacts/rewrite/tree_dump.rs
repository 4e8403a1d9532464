//! Filtered tree listing
//!
//! Walks a tree under a filter and prints every retained file path, one
//! per line. Only `Out` prunes: paths a filter would merely dive into are
//! still listed when their files survive, which makes this the quickest
//! way to preview what a rewrite would keep.

use crate::areas::database::Database;
use crate::artifacts::core::{ensure_not_cancelled, wrap_unless_cancelled};
use crate::artifacts::filter::{Filter, FilterResult};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Write the filtered file listing of a tree
pub fn dump_tree(
    cancel: &CancellationToken,
    database: &Database,
    tree: &Tree,
    prefix_path: &[String],
    filter: &dyn Filter,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    for entry in tree.entries() {
        ensure_not_cancelled(cancel)?;

        let mut full_path = prefix_path.to_vec();
        full_path.push(entry.name.clone());

        match entry.mode {
            EntryMode::Directory => {
                if filter.filter(&full_path, true) == FilterResult::Out {
                    continue;
                }
                let subtree = database.parse_object_as_tree(&entry.oid).with_context(|| {
                    format!("failed to obtain tree {}", full_path.join("/"))
                })?;

                dump_tree(cancel, database, &subtree, &full_path, filter, output).map_err(
                    |err| {
                        wrap_unless_cancelled(err, || {
                            format!("failed to dump tree {}", full_path.join("/"))
                        })
                    },
                )?;
            }
            _ => {
                if filter.filter(&full_path, false) == FilterResult::Out {
                    continue;
                }
                writeln!(output, "{}", full_path.join("/"))?;
            }
        }
    }

    Ok(())
}
