//! Formula reconstruction: office math trees to linear LaTeX.
//!
//! Decoders parse OMML (Word, PowerPoint) or MathML (OpenDocument) into a
//! [`FormulaNode`] tree, then call [`to_latex`]. Rendering never fails: node kinds
//! without a LaTeX form render as their raw text.

pub mod mathml;
pub mod omml;
pub mod symbols;

use symbols::{KNOWN_FUNCTIONS, accent_command, convert_symbols, nary_command};

/// Subtrees nested deeper than this render as raw text.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarPosition {
    Top,
    Bottom,
}

/// An office math expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaNode {
    Fraction {
        numerator: Box<FormulaNode>,
        denominator: Box<FormulaNode>,
    },
    Radical {
        degree: Option<Box<FormulaNode>>,
        radicand: Box<FormulaNode>,
    },
    Superscript {
        base: Box<FormulaNode>,
        exponent: Box<FormulaNode>,
    },
    Subscript {
        base: Box<FormulaNode>,
        index: Box<FormulaNode>,
    },
    SubSuperscript {
        base: Box<FormulaNode>,
        subscript: Box<FormulaNode>,
        superscript: Box<FormulaNode>,
    },
    Function {
        name: Box<FormulaNode>,
        argument: Box<FormulaNode>,
    },
    /// `open`/`close` of `None` mean "not specified" (parentheses); `Some("")`
    /// means explicitly no glyph.
    Delimiter {
        open: Option<String>,
        close: Option<String>,
        items: Vec<FormulaNode>,
    },
    NAry {
        operator: Option<String>,
        lower: Option<Box<FormulaNode>>,
        upper: Option<Box<FormulaNode>>,
        body: Box<FormulaNode>,
    },
    Matrix {
        rows: Vec<Vec<FormulaNode>>,
    },
    Accent {
        mark: Option<String>,
        base: Box<FormulaNode>,
    },
    Bar {
        position: BarPosition,
        base: Box<FormulaNode>,
    },
    Run(String),
    Group(Vec<FormulaNode>),
    /// A construct with no LaTeX mapping; keeps its text content.
    Unknown {
        text: String,
    },
}

impl FormulaNode {
    pub fn run(text: impl Into<String>) -> Self {
        FormulaNode::Run(text.into())
    }

    pub fn empty() -> Self {
        FormulaNode::Group(Vec::new())
    }

    pub fn fraction(numerator: FormulaNode, denominator: FormulaNode) -> Self {
        FormulaNode::Fraction {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }

    pub fn sqrt(radicand: FormulaNode) -> Self {
        FormulaNode::Radical {
            degree: None,
            radicand: Box::new(radicand),
        }
    }

    pub fn root(degree: FormulaNode, radicand: FormulaNode) -> Self {
        FormulaNode::Radical {
            degree: Some(Box::new(degree)),
            radicand: Box::new(radicand),
        }
    }

    pub fn superscript(base: FormulaNode, exponent: FormulaNode) -> Self {
        FormulaNode::Superscript {
            base: Box::new(base),
            exponent: Box::new(exponent),
        }
    }

    pub fn subscript(base: FormulaNode, index: FormulaNode) -> Self {
        FormulaNode::Subscript {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn function(name: impl Into<String>, argument: FormulaNode) -> Self {
        FormulaNode::Function {
            name: Box::new(FormulaNode::Run(name.into())),
            argument: Box::new(argument),
        }
    }

    /// Concatenated text of every run and unknown node, in document order.
    pub fn raw_text(&self) -> String {
        let mut text = String::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                FormulaNode::Run(run) => text.push_str(run),
                FormulaNode::Unknown { text: raw } => text.push_str(raw),
                other => {
                    let mut children = other.children();
                    children.reverse();
                    stack.extend(children);
                }
            }
        }
        text
    }

    fn children(&self) -> Vec<&FormulaNode> {
        match self {
            FormulaNode::Fraction { numerator, denominator } => vec![&**numerator, &**denominator],
            FormulaNode::Radical { degree, radicand } => {
                let mut children: Vec<&FormulaNode> = degree.iter().map(|d| &**d).collect();
                children.push(&**radicand);
                children
            }
            FormulaNode::Superscript { base, exponent } => vec![&**base, &**exponent],
            FormulaNode::Subscript { base, index } => vec![&**base, &**index],
            FormulaNode::SubSuperscript {
                base,
                subscript,
                superscript,
            } => vec![&**base, &**subscript, &**superscript],
            FormulaNode::Function { name, argument } => vec![&**name, &**argument],
            FormulaNode::Delimiter { items, .. } => items.iter().collect(),
            FormulaNode::NAry { lower, upper, body, .. } => {
                let mut children: Vec<&FormulaNode> = lower.iter().chain(upper.iter()).map(|b| &**b).collect();
                children.push(&**body);
                children
            }
            FormulaNode::Matrix { rows } => rows.iter().flatten().collect(),
            FormulaNode::Accent { base, .. } | FormulaNode::Bar { base, .. } => vec![&**base],
            FormulaNode::Group(children) => children.iter().collect(),
            FormulaNode::Run(_) | FormulaNode::Unknown { .. } => Vec::new(),
        }
    }
}

/// Render a formula tree as LaTeX.
pub fn to_latex(node: &FormulaNode) -> String {
    render(node, 0)
}

fn render(node: &FormulaNode, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return node.raw_text();
    }
    let depth = depth + 1;

    match node {
        FormulaNode::Fraction { numerator, denominator } => {
            format!("\\frac{{{}}}{{{}}}", render(numerator, depth), render(denominator, depth))
        }
        FormulaNode::Radical { degree, radicand } => {
            let degree = degree.as_ref().map(|d| render(d, depth));
            radical(degree.as_deref(), &render(radicand, depth))
        }
        FormulaNode::Superscript { base, exponent } => {
            format!("{}^{{{}}}", render(base, depth), render(exponent, depth))
        }
        FormulaNode::Subscript { base, index } => format!("{}_{{{}}}", render(base, depth), render(index, depth)),
        FormulaNode::SubSuperscript {
            base,
            subscript,
            superscript,
        } => format!(
            "{}_{{{}}}^{{{}}}",
            render(base, depth),
            render(subscript, depth),
            render(superscript, depth)
        ),
        FormulaNode::Function { name, argument } => {
            let name = render(name, depth);
            let name = name.trim();
            let word_end = name.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(name.len());
            let (word, suffix) = name.split_at(word_end);
            let argument = render(argument, depth);
            if KNOWN_FUNCTIONS.contains(&word) {
                format!("\\{}{}{{{}}}", word, suffix, argument)
            } else {
                format!("{}{{{}}}", name, argument)
            }
        }
        FormulaNode::Delimiter { open, close, items } => {
            let inner: Vec<String> = items.iter().map(|item| render(item, depth)).collect();
            format!(
                "{}{}{}",
                open.as_deref().unwrap_or("("),
                inner.join(", "),
                close.as_deref().unwrap_or(")")
            )
        }
        FormulaNode::NAry {
            operator,
            lower,
            upper,
            body,
        } => {
            let mut out = nary_command(operator.as_deref());
            if let Some(lower) = lower.as_ref().map(|l| render(l, depth)).filter(|l| !l.is_empty()) {
                out.push_str(&format!("_{{{}}}", lower));
            }
            if let Some(upper) = upper.as_ref().map(|u| render(u, depth)).filter(|u| !u.is_empty()) {
                out.push_str(&format!("^{{{}}}", upper));
            }
            let body = render(body, depth);
            if !body.is_empty() {
                out.push(' ');
                out.push_str(&body);
            }
            out
        }
        FormulaNode::Matrix { rows } => {
            let rows: Vec<String> = rows
                .iter()
                .map(|row| row.iter().map(|cell| render(cell, depth)).collect::<Vec<_>>().join(" & "))
                .collect();
            format!("\\begin{{matrix}}{}\\end{{matrix}}", rows.join(" \\\\ "))
        }
        FormulaNode::Accent { mark, base } => {
            format!("\\{}{{{}}}", accent_command(mark.as_deref()), render(base, depth))
        }
        FormulaNode::Bar { position, base } => {
            let command = match position {
                BarPosition::Top => "overline",
                BarPosition::Bottom => "underline",
            };
            format!("\\{}{{{}}}", command, render(base, depth))
        }
        FormulaNode::Run(text) => convert_symbols(text),
        FormulaNode::Group(children) => render_sequence(children, depth),
        FormulaNode::Unknown { text } => text.clone(),
    }
}

fn radical(degree: Option<&str>, radicand: &str) -> String {
    match degree.filter(|d| !d.is_empty()) {
        Some(degree) => format!("\\sqrt[{}]{{{}}}", degree, radicand),
        None => format!("\\sqrt{{{}}}", radicand),
    }
}

/// Render siblings in order.
///
/// Some editors emit a radical whose radicand is only an opening bracket and put
/// the rest of the expression after it; such a radical takes the following
/// siblings up to the matching closing bracket as its radicand.
fn render_sequence(children: &[FormulaNode], depth: usize) -> String {
    let mut out = String::new();
    for (position, child) in children.iter().enumerate() {
        if let FormulaNode::Radical { degree, radicand } = child {
            let inner = render(radicand, depth);
            if let Some((open, close)) = bracket_pair(inner.trim()) {
                let rest: String = children[position + 1..].iter().map(|c| render(c, depth)).collect();
                let (body, tail) = split_at_matching(&rest, open, close);
                let degree = degree.as_ref().map(|d| render(d, depth));
                out.push_str(&radical(degree.as_deref(), body));
                out.push_str(tail);
                return out;
            }
        }
        out.push_str(&render(child, depth));
    }
    out
}

fn bracket_pair(text: &str) -> Option<(char, char)> {
    match text {
        "(" => Some(('(', ')')),
        "[" => Some(('[', ']')),
        "{" => Some(('{', '}')),
        _ => None,
    }
}

/// Split after the bracket closing an already-open `open`; everything is body
/// when it never closes.
fn split_at_matching(text: &str, open: char, close: char) -> (&str, &str) {
    let mut level = 1usize;
    for (idx, ch) in text.char_indices() {
        if ch == open {
            level += 1;
        } else if ch == close {
            level -= 1;
            if level == 0 {
                return (&text[..idx], &text[idx + ch.len_utf8()..]);
            }
        }
    }
    (text, "")
}
