//! Parsing of statements and meta-commands.
//!
//! Grammar (tokens separated by whitespace):
//! ```text
//! insert <id> <username> <email>
//! select
//! select <id>
//! delete <id>
//! update <old_id> <new_id> <username> <email>
//! .exit | .btree | .constants | .verify | .stats
//! ```

use crate::common::{Error, Result};
use crate::record::Row;

/// A parsed record command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
    SelectOne(u32),
    Delete(u32),
    /// Delete `old_id`, then insert `row` (which carries the new id).
    Update { old_id: u32, row: Row },
}

impl Statement {
    /// Parse one input line.
    ///
    /// # Errors
    /// - `Error::UnrecognizedStatement` for an unknown keyword
    /// - `Error::Syntax` for missing, extra or non-numeric arguments
    /// - `Error::NegativeId` for an id below zero
    /// - `Error::StringTooLong` for an over-long username or email
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            return Err(Error::UnrecognizedStatement(line.to_string()));
        };

        match keyword {
            "insert" => {
                let [id, username, email] = expect_args::<3>("insert", args)?;
                Ok(Statement::Insert(Row::new(parse_id(id)?, username, email)?))
            }
            "select" => match args {
                [] => Ok(Statement::Select),
                [id] => Ok(Statement::SelectOne(parse_id(id)?)),
                _ => Err(Error::Syntax("usage: select [id]".into())),
            },
            "delete" => {
                let [id] = expect_args::<1>("delete", args)?;
                Ok(Statement::Delete(parse_id(id)?))
            }
            "update" => {
                let [old_id, new_id, username, email] = expect_args::<4>("update", args)?;
                let old_id = parse_id(old_id)?;
                let row = Row::new(parse_id(new_id)?, username, email)?;
                Ok(Statement::Update { old_id, row })
            }
            _ => Err(Error::UnrecognizedStatement(line.to_string())),
        }
    }
}

/// A parsed dot-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    BTree,
    Constants,
    Verify,
    Stats,
}

impl MetaCommand {
    /// # Errors
    /// Returns `Error::UnrecognizedMetaCommand` for anything unknown.
    pub fn parse(line: &str) -> Result<Self> {
        match line.trim() {
            ".exit" => Ok(MetaCommand::Exit),
            ".btree" => Ok(MetaCommand::BTree),
            ".constants" => Ok(MetaCommand::Constants),
            ".verify" => Ok(MetaCommand::Verify),
            ".stats" => Ok(MetaCommand::Stats),
            other => Err(Error::UnrecognizedMetaCommand(other.to_string())),
        }
    }
}

fn expect_args<'a, const N: usize>(keyword: &str, args: &[&'a str]) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args)
        .map_err(|_| Error::Syntax(format!("{} takes {} arguments", keyword, N)))
}

fn parse_id(token: &str) -> Result<u32> {
    let value: i64 = token
        .parse()
        .map_err(|_| Error::Syntax(format!("'{}' is not an id", token)))?;
    if value < 0 {
        return Err(Error::NegativeId);
    }
    u32::try_from(value).map_err(|_| Error::Syntax(format!("id {} is too large", value)))
}
