//! Commit object
//!
//! Commits tie a tree to its history: parent links, author/committer
//! identities and the message. A commit may additionally carry a signature
//! block; the block participates in the canonical encoding (so a signed
//! commit read from a store round-trips digest-exactly), but every commit
//! constructed by the rewriters in this crate is unsigned.
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0tree <tree-digest>
//! parent <parent-digest>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! gpgsig <first signature line>
//!  <continued signature lines>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Write};

/// Author or committer identity with timestamp
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    pub fn new(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }

    /// Format as `Name <email@example.com>`
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Canonical header form: `name <email> timestamp timezone`
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// Human-readable timestamp, e.g. `Sat Sep 2 20:19:42 2023 -0400`
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Format: "name <email> timestamp timezone"
        // Split from the right so names containing spaces survive
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(anyhow::anyhow!("invalid author format: {value}"));
        }

        let timezone = parts[0];
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("invalid timestamp: {}", parts[1]))?;
        let name_email_part = parts[2]; // "name <email>"

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| anyhow::anyhow!("invalid author format: missing '<'"))?;
        let email_end = name_email_part
            .find('>')
            .ok_or_else(|| anyhow::anyhow!("invalid author format: missing '>'"))?;

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let offset = parse_timezone(timezone)?;
        let datetime = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid timestamp: {timestamp}"))?
            .with_timezone(&offset);

        Ok(Author {
            name,
            email,
            timestamp: datetime,
        })
    }
}

/// Parse a `+HHMM` / `-HHMM` timezone suffix into a fixed offset
fn parse_timezone(value: &str) -> anyhow::Result<chrono::FixedOffset> {
    if value.len() != 5 {
        return Err(anyhow::anyhow!("invalid timezone: {value}"));
    }

    let sign = match &value[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(anyhow::anyhow!("invalid timezone sign: {value}")),
    };
    let hours: i32 = value[1..3].parse()?;
    let minutes: i32 = value[3..5].parse()?;

    chrono::FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("timezone offset out of range: {value}"))
}

/// History snapshot referencing a tree and zero or more parents
#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct Commit {
    /// Parent commit digests (empty for a root, multiple only on merges,
    /// which the history walkers reject)
    parents: Vec<ObjectId>,
    /// Digest of the tree snapshot
    tree_oid: ObjectId,
    /// Author of the change
    author: Author,
    /// Committer who recorded it
    committer: Author,
    /// Commit message, carried verbatim
    message: String,
    /// Optional signature block, without the `gpgsig ` prefix
    #[new(default)]
    signature: Option<String>,
}

impl Commit {
    /// Attach a signature block (used when parsing signed input commits)
    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// First line of the message, for log output
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.author.timestamp()
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut headers = vec![];

        headers.push(format!("tree {}", self.tree_oid.as_ref()));
        for parent in &self.parents {
            headers.push(format!("parent {}", parent.as_ref()));
        }
        headers.push(format!("author {}", self.author.display()));
        headers.push(format!("committer {}", self.committer.display()));
        if let Some(signature) = &self.signature {
            let mut sig_lines = signature.lines();
            let first = sig_lines.next().unwrap_or("");
            headers.push(format!("gpgsig {first}"));
            for line in sig_lines {
                headers.push(format!(" {line}"));
            }
        }

        let object_content = format!("{}\n\n{}", headers.join("\n"), self.message);

        let mut commit_bytes = Vec::new();
        let header = format!(
            "{} {}\0",
            self.object_type().as_str(),
            object_content.len()
        );
        commit_bytes.write_all(header.as_bytes())?;
        commit_bytes.write_all(object_content.as_bytes())?;

        Ok(Bytes::from(commit_bytes))
    }
}

impl Unpackable for Commit {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;
        let content = String::from_utf8(content)?;

        // Headers end at the first blank line; everything after it is the
        // message, kept verbatim so re-encoding reproduces the input bytes.
        let (headers, message) = content
            .split_once("\n\n")
            .context("invalid commit object: missing message separator")?;

        let mut lines = headers.lines().peekable();

        let tree_line = lines
            .next()
            .context("invalid commit object: missing tree line")?;
        let tree_oid = tree_line
            .strip_prefix("tree ")
            .context("invalid commit object: invalid tree line")?
            .to_string();
        let tree_oid = ObjectId::try_parse(tree_oid)?;

        let mut parents = Vec::new();
        while let Some(line) = lines.peek() {
            match line.strip_prefix("parent ") {
                Some(parent_oid) => {
                    parents.push(ObjectId::try_parse(parent_oid.to_string())?);
                    lines.next();
                }
                None => break,
            }
        }

        let author_line = lines
            .next()
            .context("invalid commit object: missing author line")?;
        let author = author_line
            .strip_prefix("author ")
            .context("invalid commit object: invalid author line")?;
        let author = Author::try_from(author)?;

        let committer_line = lines
            .next()
            .context("invalid commit object: missing committer line")?;
        let committer = committer_line
            .strip_prefix("committer ")
            .context("invalid commit object: invalid committer line")?;
        let committer = Author::try_from(committer)?;

        let mut signature = None;
        if let Some(line) = lines.peek() {
            if let Some(first) = line.strip_prefix("gpgsig ") {
                let mut sig_lines = vec![first.to_string()];
                lines.next();
                while let Some(line) = lines.peek() {
                    match line.strip_prefix(' ') {
                        Some(continued) => {
                            sig_lines.push(continued.to_string());
                            lines.next();
                        }
                        None => break,
                    }
                }
                signature = Some(sig_lines.join("\n"));
            }
        }

        let commit = Commit::new(parents, tree_oid, author, committer, message.to_string());
        Ok(match signature {
            Some(signature) => commit.with_signature(signature),
            None => commit,
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        let mut lines = vec![];

        lines.push(format!("commit {}", self.object_id().unwrap_or_default()));
        lines.push(format!("Author: {}", self.author.display_name()));
        lines.push(format!("Date:   {}", self.author.readable_timestamp()));
        lines.push(String::new());
        for message_line in self.message.lines() {
            lines.push(format!("    {message_line}"));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_author() -> Author {
        let timestamp = chrono::DateTime::parse_from_rfc3339("2023-09-02T20:19:42-04:00")
            .expect("valid timestamp");
        Author::new("Chao Xu".to_string(), "chao@example.com".to_string(), timestamp)
    }

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).expect("valid digest")
    }

    #[test]
    fn author_header_round_trips() {
        let author = fixed_author();
        let parsed = Author::try_from(author.display().as_str()).expect("parse author");
        assert_eq!(parsed, author);
    }

    #[test]
    fn unsigned_commit_round_trips_digest_exactly() {
        let commit = Commit::new(
            vec![oid('1')],
            oid('2'),
            fixed_author(),
            fixed_author(),
            "Add the parser\n\nWith a body paragraph.".to_string(),
        );

        let encoded = commit.serialize().expect("serialize");
        let header_end = encoded.iter().position(|b| *b == 0).expect("header NUL");
        let decoded =
            Commit::deserialize(&encoded[header_end + 1..]).expect("deserialize");

        assert_eq!(decoded, commit);
        assert_eq!(
            decoded.object_id().unwrap(),
            commit.object_id().unwrap()
        );
    }

    #[test]
    fn signed_commit_round_trips_signature_block() {
        let signature = "-----BEGIN PGP SIGNATURE-----\nabcdef\n-----END PGP SIGNATURE-----";
        let commit = Commit::new(
            vec![],
            oid('3'),
            fixed_author(),
            fixed_author(),
            "Signed change".to_string(),
        )
        .with_signature(signature.to_string());

        let encoded = commit.serialize().expect("serialize");
        let header_end = encoded.iter().position(|b| *b == 0).expect("header NUL");
        let decoded =
            Commit::deserialize(&encoded[header_end + 1..]).expect("deserialize");

        assert_eq!(decoded.signature(), Some(signature));
        assert_eq!(
            decoded.object_id().unwrap(),
            commit.object_id().unwrap()
        );
    }

    #[test]
    fn signature_changes_the_digest() {
        let unsigned = Commit::new(
            vec![],
            oid('4'),
            fixed_author(),
            fixed_author(),
            "Same content".to_string(),
        );
        let signed = unsigned.clone().with_signature("sig".to_string());

        assert_ne!(
            unsigned.object_id().unwrap(),
            signed.object_id().unwrap()
        );
    }
}
