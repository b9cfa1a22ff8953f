//! Newick reader producing the crate's arena [`Tree`].
//!
//! Supports N-ary nodes, quoted and unquoted labels, branch lengths, and
//! square-bracket comments. A file may hold several semicolon-terminated
//! trees. Labels are kept verbatim; id-convention handling happens later in
//! the taxon layer.

use std::path::Path;

use thiserror::Error;

use crate::core::tree::{NodeIndex, Tree};

#[derive(Error, Debug)]
pub enum NewickError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid newick at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("no trees found in input")]
    Empty,
}

/// Parses every tree in a newick file.
///
/// # Errors
///
/// Returns `NewickError::Io` if the file cannot be read, `Syntax` on
/// malformed content, or `Empty` when the input holds no tree at all.
pub fn parse_file(path: &Path) -> Result<Vec<Tree>, NewickError> {
    let content = std::fs::read_to_string(path)?;
    parse_text(&content)
}

/// Parses every semicolon-terminated tree in `text`.
///
/// # Errors
///
/// Returns `NewickError::Syntax` on malformed content or `Empty` when the
/// input holds no tree at all.
pub fn parse_text(text: &str) -> Result<Vec<Tree>, NewickError> {
    let mut cursor = Cursor::new(text);
    let mut trees = Vec::new();
    loop {
        cursor.skip_trivia();
        if cursor.at_end() {
            break;
        }
        trees.push(parse_tree(&mut cursor)?);
    }
    if trees.is_empty() {
        return Err(NewickError::Empty);
    }
    Ok(trees)
}

fn parse_tree(cursor: &mut Cursor<'_>) -> Result<Tree, NewickError> {
    let mut tree = Tree::new();
    let root = tree.add_root();
    parse_node(cursor, &mut tree, root)?;
    cursor.skip_trivia();
    if !cursor.consume_if(b';') {
        return Err(cursor.error("expected ';' at end of tree"));
    }
    Ok(tree)
}

/// `node := ('(' node (',' node)* ')')? label? (':' length)?`
fn parse_node(cursor: &mut Cursor<'_>, tree: &mut Tree, node: NodeIndex) -> Result<(), NewickError> {
    cursor.skip_trivia();

    if cursor.consume_if(b'(') {
        loop {
            let child = tree.add_child(node);
            parse_node(cursor, tree, child)?;
            cursor.skip_trivia();
            match cursor.bump() {
                Some(b',') => continue,
                Some(b')') => break,
                _ => return Err(cursor.error("expected ',' or ')' in child list")),
            }
        }
        cursor.skip_trivia();
    }

    let label = cursor.read_label()?;
    if !label.is_empty() {
        tree[node].taxon = Some(label);
    }

    cursor.skip_trivia();
    if cursor.consume_if(b':') {
        cursor.skip_trivia();
        tree[node].length = Some(cursor.read_number()?);
    }
    Ok(())
}

/// Byte cursor over the input; all structural characters are ASCII, so byte
/// scanning never splits a UTF-8 label.
struct Cursor<'a> {
    text: &'a str,
    position: usize,
}

const LABEL_DELIMITERS: &[u8] = b"(),:;[] \t\r\n";

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    fn at_end(&self) -> bool {
        self.position >= self.text.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.position).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Some(byte)
    }

    fn consume_if(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Skips whitespace and `[...]` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(byte) if byte.is_ascii_whitespace() => {
                    self.position += 1;
                }
                Some(b'[') => {
                    while let Some(byte) = self.bump() {
                        if byte == b']' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    /// Reads a possibly quoted label; empty when the next byte is a
    /// delimiter (anonymous node).
    fn read_label(&mut self) -> Result<String, NewickError> {
        if self.consume_if(b'\'') {
            let mut label = String::new();
            let mut start = self.position;
            loop {
                match self.peek() {
                    Some(b'\'') => {
                        label.push_str(&self.text[start..self.position]);
                        self.position += 1;
                        // doubled quote is an escaped quote inside the label
                        if self.consume_if(b'\'') {
                            label.push('\'');
                            start = self.position;
                        } else {
                            return Ok(label);
                        }
                    }
                    Some(_) => self.position += 1,
                    None => return Err(self.error("unterminated quoted label")),
                }
            }
        }
        let start = self.position;
        while let Some(byte) = self.peek() {
            if LABEL_DELIMITERS.contains(&byte) {
                break;
            }
            self.position += 1;
        }
        Ok(self.text[start..self.position].to_string())
    }

    fn read_number(&mut self) -> Result<f64, NewickError> {
        let start = self.position;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_digit() || matches!(byte, b'+' | b'-' | b'.' | b'e' | b'E') {
                self.position += 1;
            } else {
                break;
            }
        }
        self.text[start..self.position]
            .parse::<f64>()
            .map_err(|_| self.error("expected a branch length"))
    }

    fn error(&self, message: &str) -> NewickError {
        NewickError::Syntax {
            position: self.position,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxa_in_preorder(tree: &Tree) -> Vec<String> {
        tree.preorder()
            .filter_map(|i| tree[i].taxon.clone())
            .collect()
    }

    #[test]
    fn test_parse_simple_tree() {
        let trees = parse_text("(A,B);").unwrap();
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(taxa_in_preorder(tree), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_nested_with_internal_label_and_lengths() {
        let trees = parse_text("((A:0.1,B:0.2)ab:0.3,C:0.4);").unwrap();
        let tree = &trees[0];
        let root = tree.root_index();
        let ab = tree[root].children[0];
        assert_eq!(tree[ab].taxon.as_deref(), Some("ab"));
        assert_eq!(tree[ab].length, Some(0.3));
        let a = tree[ab].children[0];
        assert_eq!(tree[a].taxon.as_deref(), Some("A"));
        assert_eq!(tree[a].length, Some(0.1));
    }

    #[test]
    fn test_parse_multifurcation() {
        let trees = parse_text("(A,B,C,D);").unwrap();
        let root = trees[0].root_index();
        assert_eq!(trees[0][root].children.len(), 4);
    }

    #[test]
    fn test_parse_quoted_label_with_spaces() {
        let trees = parse_text("('Canis lupus',B);").unwrap();
        assert_eq!(
            taxa_in_preorder(&trees[0]),
            vec!["Canis lupus".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_parse_quoted_label_with_escaped_quote() {
        let trees = parse_text("('it''s',B);").unwrap();
        assert_eq!(taxa_in_preorder(&trees[0])[0], "it's");
    }

    #[test]
    fn test_comments_are_skipped() {
        let trees = parse_text("[tree comment]((A,B)[internal],C);").unwrap();
        assert_eq!(trees[0].num_leaves(), 3);
    }

    #[test]
    fn test_multiple_trees() {
        let trees = parse_text("(A,B);\n(C,(D,E));\n").unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[1].num_leaves(), 3);
    }

    #[test]
    fn test_non_ascii_labels() {
        let trees = parse_text("(Aotus_azarae_\u{00f1}1,B);").unwrap();
        assert_eq!(taxa_in_preorder(&trees[0])[0], "Aotus_azarae_\u{00f1}1");
    }

    #[test]
    fn test_missing_semicolon_is_an_error() {
        let err = parse_text("(A,B)").unwrap_err();
        assert!(matches!(err, NewickError::Syntax { .. }));
    }

    #[test]
    fn test_unbalanced_parens_is_an_error() {
        assert!(parse_text("((A,B);").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_text("  \n"), Err(NewickError::Empty)));
    }

    #[test]
    fn test_scientific_notation_length() {
        let trees = parse_text("(A:1e-3,B:2.5E2);").unwrap();
        let root = trees[0].root_index();
        let a = trees[0][root].children[0];
        assert_eq!(trees[0][a].length, Some(0.001));
    }
}
