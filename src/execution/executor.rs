//! Execution of parsed commands against a [`Table`].

use crate::common::Result;
use crate::execution::statement::{MetaCommand, Statement};
use crate::index::btree::BPlusTree;
use crate::record::Row;
use crate::table::Table;

/// What a statement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The statement ran and has nothing to show.
    Done,
    /// Rows to print, in ascending id order.
    Rows(Vec<Row>),
}

/// What a meta-command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaOutcome {
    /// The session should end.
    Exit,
    /// Text to print.
    Output(String),
}

/// Run one statement.
///
/// # Errors
/// Logical errors (`DuplicateKey`, `KeyNotFound`) leave the table as it
/// was; anything else comes from the storage layer.
pub fn execute(table: &mut Table, statement: &Statement) -> Result<ExecuteOutcome> {
    match statement {
        Statement::Insert(row) => {
            table.insert(row)?;
            Ok(ExecuteOutcome::Done)
        }
        Statement::Select => Ok(ExecuteOutcome::Rows(table.select_all()?)),
        Statement::SelectOne(id) => Ok(ExecuteOutcome::Rows(vec![table.select_one(*id)?])),
        Statement::Delete(id) => {
            table.delete(*id)?;
            Ok(ExecuteOutcome::Done)
        }
        Statement::Update { old_id, row } => {
            table.update(*old_id, row)?;
            Ok(ExecuteOutcome::Done)
        }
    }
}

/// Run one meta-command.
pub fn execute_meta(table: &mut Table, command: MetaCommand) -> Result<MetaOutcome> {
    let text = match command {
        MetaCommand::Exit => return Ok(MetaOutcome::Exit),
        MetaCommand::BTree => format!("Tree:\n{}", table.tree().dump_tree()?),
        MetaCommand::Constants => format!("Constants:\n{}", BPlusTree::constants()),
        MetaCommand::Verify => {
            table.tree().verify()?;
            "Tree is consistent.\n".to_string()
        }
        MetaCommand::Stats => {
            let tree = table.tree();
            let pager = tree.pager();
            format!(
                "{}\npages in use: {} of {}\n",
                pager.stats().snapshot(),
                pager.allocated_count(),
                pager.max_pages()
            )
        }
    };
    Ok(MetaOutcome::Output(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use tempfile::tempdir;

    fn run(table: &mut Table, line: &str) -> Result<ExecuteOutcome> {
        execute(table, &Statement::parse(line)?)
    }

    #[test]
    fn test_insert_then_select() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();

        assert_eq!(
            run(&mut table, "insert 1 user1 person1@example.com").unwrap(),
            ExecuteOutcome::Done
        );
        match run(&mut table, "select").unwrap() {
            ExecuteOutcome::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].to_string(), "(1, user1, person1@example.com)");
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_errors() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        run(&mut table, "insert 1 a b").unwrap();

        assert!(matches!(run(&mut table, "insert 1 c d"), Err(Error::DuplicateKey(1))));
        assert!(matches!(run(&mut table, "delete 2"), Err(Error::KeyNotFound(2))));
        assert!(matches!(run(&mut table, "select 2"), Err(Error::KeyNotFound(2))));
        assert!(matches!(
            run(&mut table, "update 2 3 a b"),
            Err(Error::KeyNotFound(2))
        ));
    }

    #[test]
    fn test_meta_commands() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        for id in 1..=4 {
            run(&mut table, &format!("insert {} u e", id)).unwrap();
        }

        assert_eq!(execute_meta(&mut table, MetaCommand::Exit).unwrap(), MetaOutcome::Exit);
        match execute_meta(&mut table, MetaCommand::BTree).unwrap() {
            MetaOutcome::Output(text) => {
                assert!(text.starts_with("Tree:\n- internal (size 1)\n"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match execute_meta(&mut table, MetaCommand::Verify).unwrap() {
            MetaOutcome::Output(text) => assert_eq!(text, "Tree is consistent.\n"),
            other => panic!("unexpected {:?}", other),
        }
        match execute_meta(&mut table, MetaCommand::Stats).unwrap() {
            MetaOutcome::Output(text) => assert!(text.contains("pages in use: 4 of 400")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
