//! Unicode math glyphs and their LaTeX commands.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static SYMBOL_TO_LATEX: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // Greek, lower case
    m.insert('α', "\\alpha");
    m.insert('β', "\\beta");
    m.insert('γ', "\\gamma");
    m.insert('δ', "\\delta");
    m.insert('ε', "\\epsilon");
    m.insert('ζ', "\\zeta");
    m.insert('η', "\\eta");
    m.insert('θ', "\\theta");
    m.insert('ι', "\\iota");
    m.insert('κ', "\\kappa");
    m.insert('λ', "\\lambda");
    m.insert('μ', "\\mu");
    m.insert('ν', "\\nu");
    m.insert('ξ', "\\xi");
    m.insert('ο', "o");
    m.insert('π', "\\pi");
    m.insert('ρ', "\\rho");
    m.insert('ς', "\\varsigma");
    m.insert('σ', "\\sigma");
    m.insert('τ', "\\tau");
    m.insert('υ', "\\upsilon");
    m.insert('φ', "\\phi");
    m.insert('χ', "\\chi");
    m.insert('ψ', "\\psi");
    m.insert('ω', "\\omega");
    m.insert('ϑ', "\\vartheta");
    m.insert('ϕ', "\\varphi");
    m.insert('ϵ', "\\varepsilon");

    // Greek, upper case (letters without a Latin look-alike)
    m.insert('Γ', "\\Gamma");
    m.insert('Δ', "\\Delta");
    m.insert('Θ', "\\Theta");
    m.insert('Λ', "\\Lambda");
    m.insert('Ξ', "\\Xi");
    m.insert('Π', "\\Pi");
    m.insert('Σ', "\\Sigma");
    m.insert('Υ', "\\Upsilon");
    m.insert('Φ', "\\Phi");
    m.insert('Ψ', "\\Psi");
    m.insert('Ω', "\\Omega");

    // Operators
    m.insert('±', "\\pm");
    m.insert('∓', "\\mp");
    m.insert('×', "\\times");
    m.insert('÷', "\\div");
    m.insert('·', "\\cdot");
    m.insert('⋅', "\\cdot");
    m.insert('∘', "\\circ");
    m.insert('−', "-");
    m.insert('∗', "*");
    m.insert('⊕', "\\oplus");
    m.insert('⊗', "\\otimes");
    m.insert('∑', "\\sum");
    m.insert('∏', "\\prod");
    m.insert('∫', "\\int");
    m.insert('∮', "\\oint");
    m.insert('√', "\\surd");

    // Relations
    m.insert('≤', "\\leq");
    m.insert('≥', "\\geq");
    m.insert('≠', "\\neq");
    m.insert('≈', "\\approx");
    m.insert('≡', "\\equiv");
    m.insert('∼', "\\sim");
    m.insert('≅', "\\cong");
    m.insert('∝', "\\propto");
    m.insert('≪', "\\ll");
    m.insert('≫', "\\gg");
    m.insert('⊥', "\\perp");
    m.insert('∥', "\\parallel");

    // Sets and logic
    m.insert('∈', "\\in");
    m.insert('∉', "\\notin");
    m.insert('∋', "\\ni");
    m.insert('⊂', "\\subset");
    m.insert('⊃', "\\supset");
    m.insert('⊆', "\\subseteq");
    m.insert('⊇', "\\supseteq");
    m.insert('∪', "\\cup");
    m.insert('∩', "\\cap");
    m.insert('∅', "\\emptyset");
    m.insert('∀', "\\forall");
    m.insert('∃', "\\exists");
    m.insert('∄', "\\nexists");
    m.insert('¬', "\\neg");
    m.insert('∧', "\\wedge");
    m.insert('∨', "\\vee");

    // Arrows
    m.insert('→', "\\rightarrow");
    m.insert('←', "\\leftarrow");
    m.insert('↔', "\\leftrightarrow");
    m.insert('⇒', "\\Rightarrow");
    m.insert('⇐', "\\Leftarrow");
    m.insert('⇔', "\\Leftrightarrow");
    m.insert('↦', "\\mapsto");
    m.insert('↑', "\\uparrow");
    m.insert('↓', "\\downarrow");

    // Analysis and misc
    m.insert('∞', "\\infty");
    m.insert('∂', "\\partial");
    m.insert('∇', "\\nabla");
    m.insert('∠', "\\angle");
    m.insert('°', "^{\\circ}");
    m.insert('′', "'");
    m.insert('″', "''");
    m.insert('…', "\\ldots");
    m.insert('⋯', "\\cdots");
    m.insert('ℏ', "\\hbar");
    m.insert('ℓ', "\\ell");

    // Blackboard bold
    m.insert('ℕ', "\\mathbb{N}");
    m.insert('ℤ', "\\mathbb{Z}");
    m.insert('ℚ', "\\mathbb{Q}");
    m.insert('ℝ', "\\mathbb{R}");
    m.insert('ℂ', "\\mathbb{C}");

    // Invisible operators (function application, invisible times, separator)
    m.insert('\u{2061}', "");
    m.insert('\u{2062}', "");
    m.insert('\u{2063}', "");

    m
});

/// Replace every known math glyph in `text` by its command. Other characters
/// pass through unchanged and no spacing is added.
pub fn convert_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match SYMBOL_TO_LATEX.get(&ch) {
            Some(command) => out.push_str(command),
            None => out.push(ch),
        }
    }
    out
}

/// Large operators for n-ary expressions. `None` is the integral, the OMML default.
pub fn nary_command(operator: Option<&str>) -> String {
    let Some(operator) = operator.map(str::trim).filter(|op| !op.is_empty()) else {
        return "\\int".to_string();
    };
    let command = match operator {
        "∑" => "\\sum",
        "∏" => "\\prod",
        "∐" => "\\coprod",
        "∫" => "\\int",
        "∬" => "\\iint",
        "∭" => "\\iiint",
        "∮" => "\\oint",
        "∯" => "\\oiint",
        "⋃" => "\\bigcup",
        "⋂" => "\\bigcap",
        "⋀" => "\\bigwedge",
        "⋁" => "\\bigvee",
        "⨁" => "\\bigoplus",
        "⨂" => "\\bigotimes",
        other => return convert_symbols(other),
    };
    command.to_string()
}

/// True for glyphs MathML uses as the base of a large operator.
pub fn is_large_operator(text: &str) -> bool {
    matches!(
        text.trim(),
        "∑" | "∏" | "∐" | "∫" | "∬" | "∭" | "∮" | "∯" | "⋃" | "⋂" | "⋀" | "⋁" | "⨁" | "⨂"
    )
}

/// Accent command for a combining (or spacing) accent character. Unknown or
/// missing accents use `hat`, the OMML default.
pub fn accent_command(mark: Option<&str>) -> &'static str {
    match mark.map(str::trim).unwrap_or("") {
        "\u{0302}" | "^" | "ˆ" => "hat",
        "\u{0303}" | "~" | "˜" => "tilde",
        "\u{0304}" | "\u{0305}" | "¯" => "bar",
        "\u{20D7}" | "\u{20D1}" | "→" => "vec",
        "\u{0307}" | "˙" => "dot",
        "\u{0308}" | "¨" => "ddot",
        "\u{0306}" | "˘" => "breve",
        "\u{030C}" | "ˇ" => "check",
        "\u{0301}" | "´" => "acute",
        "\u{0300}" | "`" => "grave",
        _ => "hat",
    }
}

/// Function names rendered as `\name`.
pub const KNOWN_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh", "tanh", "coth", "log",
    "ln", "lg", "exp", "lim", "max", "min", "sup", "inf", "det", "dim", "gcd", "deg", "arg", "ker", "hom", "Pr",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_symbols_keeps_spacing() {
        assert_eq!(convert_symbols("x + α = β × γ"), "x + \\alpha = \\beta \\times \\gamma");
        assert_eq!(convert_symbols("-b±"), "-b\\pm");
        assert_eq!(convert_symbols("2π"), "2\\pi");
    }

    #[test]
    fn test_greek_alphabet() {
        assert_eq!(convert_symbols("αβγδ"), "\\alpha\\beta\\gamma\\delta");
        assert_eq!(convert_symbols("ο"), "o");
        assert_eq!(convert_symbols("ΓΔΘΛΞΠΣΥΦΨΩ"), "\\Gamma\\Delta\\Theta\\Lambda\\Xi\\Pi\\Sigma\\Upsilon\\Phi\\Psi\\Omega");
    }

    #[test]
    fn test_relations_sets_and_arrows() {
        assert_eq!(convert_symbols("≤≥≠"), "\\leq\\geq\\neq");
        assert_eq!(convert_symbols("∈⊂∪∩"), "\\in\\subset\\cup\\cap");
        assert_eq!(convert_symbols("∀∃∅"), "\\forall\\exists\\emptyset");
        assert_eq!(convert_symbols("→←⇒"), "\\rightarrow\\leftarrow\\Rightarrow");
        assert_eq!(convert_symbols("ℕℝ"), "\\mathbb{N}\\mathbb{R}");
        assert_eq!(convert_symbols("∞∂∇"), "\\infty\\partial\\nabla");
    }

    #[test]
    fn test_plain_ascii_passes_through() {
        assert_eq!(convert_symbols("f(x)=ax+b"), "f(x)=ax+b");
    }

    #[test]
    fn test_nary_command_defaults_to_integral() {
        assert_eq!(nary_command(None), "\\int");
        assert_eq!(nary_command(Some("")), "\\int");
        assert_eq!(nary_command(Some("∑")), "\\sum");
        assert_eq!(nary_command(Some("∭")), "\\iiint");
    }

    #[test]
    fn test_accent_command() {
        assert_eq!(accent_command(Some("\u{0303}")), "tilde");
        assert_eq!(accent_command(Some("\u{20D7}")), "vec");
        assert_eq!(accent_command(Some("\u{2605}")), "hat");
        assert_eq!(accent_command(None), "hat");
    }
}
