//! Signature help for built-in function calls.

use serde::Deserialize;
use tower_lsp::lsp_types::{
    Documentation, ParameterInformation, ParameterLabel, SignatureHelp, SignatureInformation,
};

use macro_syntax::{Field, NodeKind, SyntaxTree};

const SIGNATURES_TOML: &str = include_str!("signatures.toml");

/// Built-in function signatures
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureTable {
    #[serde(default)]
    pub functions: Vec<FunctionSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    #[serde(default)]
    pub overloads: Vec<Overload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Overload {
    #[serde(default)]
    pub description: String,
    /// Separator between parameters of one group
    #[serde(default)]
    pub delimiter: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One piece of a call's written form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Part {
    pub bracket: Option<String>,
    pub escape: Option<String>,
    pub params: Vec<ParamDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamDoc {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
}

impl Overload {
    pub fn param_count(&self) -> usize {
        self.parts.iter().map(|p| p.params.len()).sum()
    }
}

impl SignatureTable {
    pub fn load_from_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The table shipped with the crate
    pub fn builtin() -> Result<Self, toml::de::Error> {
        Self::load_from_str(SIGNATURES_TOML)
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// Signature help for the call enclosing `offset`
pub fn get_signature_help(
    tree: &SyntaxTree,
    offset: usize,
    table: &SignatureTable,
) -> Option<SignatureHelp> {
    let node = tree.node_at_offset(offset);
    let call = node.find_ancestor_of(NodeKind::Call)?;
    let ident = call
        .child_by_field(Field::Name)
        .or_else(|| call.child(0))?;
    let function = table.get(ident.text())?;

    // Parameters before the one holding the cursor. Outside every parameter
    // this counts them all.
    let param = node.find_ancestor_of(NodeKind::CallParam);
    let active_parameter = call
        .children()
        .filter(|c| c.kind() == NodeKind::CallParam)
        .take_while(|c| Some(*c) != param)
        .count();

    let signatures: Vec<SignatureInformation> = function
        .overloads
        .iter()
        .map(|overload| build_signature_info(&function.name, overload))
        .collect();
    let active_signature = function
        .overloads
        .iter()
        .position(|o| o.param_count() > active_parameter)
        .unwrap_or(0);

    Some(SignatureHelp {
        signatures,
        active_signature: Some(active_signature as u32),
        active_parameter: Some(active_parameter as u32),
    })
}

/// Written form of an overload, e.g. `ATAN[y]/[x]` or `SETVN var[name]`
fn build_signature_info(name: &str, overload: &Overload) -> SignatureInformation {
    let mut label = name.to_string();
    let mut parameters = Vec::new();
    let mut delimiter = String::new();

    for (index, part) in overload.parts.iter().enumerate() {
        if let Some(bracket) = &part.bracket {
            delimiter.clear();
            label.push_str(bracket);
        } else if let Some(escape) = &part.escape {
            delimiter.clear();
            label.push_str(escape);
        }

        if part.params.is_empty() {
            continue;
        }
        // A leading parameter group is separated from the name.
        if index == 0 {
            label.push(' ');
        }
        for param in &part.params {
            if !overload.delimiter.is_empty() {
                label.push_str(&delimiter);
            }
            let start = utf16_len(&label);
            label.push_str(&param.name);
            parameters.push(ParameterInformation {
                label: ParameterLabel::LabelOffsets([start, utf16_len(&label)]),
                documentation: param.doc.clone().map(Documentation::String),
            });
            delimiter = format!("{} ", overload.delimiter);
        }
    }

    SignatureInformation {
        label,
        documentation: (!overload.description.is_empty())
            .then(|| Documentation::String(overload.description.clone())),
        parameters: Some(parameters),
        active_parameter: None,
    }
}

/// Label offsets count UTF-16 code units
fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_syntax::{FileKind, TreeBuilder};

    fn table() -> SignatureTable {
        SignatureTable::builtin().expect("should parse built-in signatures")
    }

    fn labels(help: &SignatureHelp) -> Vec<&str> {
        help.signatures.iter().map(|s| s.label.as_str()).collect()
    }

    /// `#1=ATAN[#2,#3]` with the call params as CallParam nodes
    fn atan_call() -> SyntaxTree {
        let mut b = TreeBuilder::new(FileKind::Program);
        b.start(NodeKind::Statement);
        b.start(NodeKind::Assignment);
        b.token_field(NodeKind::Variable, Field::Target, "#1");
        b.trivia("=");
        b.start_field(NodeKind::Call, Field::Value);
        b.token_field(NodeKind::Other, Field::Name, "atan");
        b.trivia("[");
        b.start(NodeKind::CallParam);
        b.token(NodeKind::Variable, "#2");
        b.finish();
        b.trivia(",");
        b.start(NodeKind::CallParam);
        b.token(NodeKind::Variable, "#3");
        b.finish();
        b.trivia("]");
        b.build()
    }

    #[test]
    fn test_builtin_table_loads() {
        let table = table();
        assert!(table.functions.len() >= 15);
        assert!(table.get("sqrt").is_some());
        assert!(table.get("SQRT").is_some());
        assert!(table.get("unknown").is_none());
    }

    #[test]
    fn test_load_from_str_empty() {
        let table = SignatureTable::load_from_str("").expect("should parse empty");
        assert!(table.functions.is_empty());
    }

    #[test]
    fn test_labels() {
        let table = table();
        let atan = table.get("ATAN").expect("ATAN");
        let info = build_signature_info(&atan.name, &atan.overloads[0]);
        assert_eq!(info.label, "ATAN[y]/[x]");
        let info = build_signature_info(&atan.name, &atan.overloads[1]);
        assert_eq!(info.label, "ATAN[y, x]");

        let setvn = table.get("SETVN").expect("SETVN");
        let info = build_signature_info(&setvn.name, &setvn.overloads[0]);
        assert_eq!(info.label, "SETVN var[name]");
    }

    #[test]
    fn test_parameter_offsets() {
        let table = table();
        let atan = table.get("ATAN").expect("ATAN");
        let info = build_signature_info(&atan.name, &atan.overloads[1]);
        let params = info.parameters.expect("parameters");
        assert_eq!(params.len(), 2);
        let &ParameterLabel::LabelOffsets([start, end]) = &params[1].label else {
            panic!("expected offsets");
        };
        assert_eq!(&info.label[start as usize..end as usize], "x");
    }

    #[test]
    fn test_parameter_offsets_count_utf16_units() {
        let table = SignatureTable::load_from_str(
            r#"
            [[functions]]
            name = "ÜBER"
            [[functions.overloads]]
            delimiter = ","
            parts = [{ bracket = "[" }, { params = [{ name = "α" }, { name = "β" }] }, { bracket = "]" }]
            "#,
        )
        .expect("should parse table");
        let function = table.get("ÜBER").expect("ÜBER");
        let info = build_signature_info(&function.name, &function.overloads[0]);
        assert_eq!(info.label, "ÜBER[α, β]");

        let units: Vec<u16> = info.label.encode_utf16().collect();
        let params = info.parameters.expect("parameters");
        let offsets: Vec<[u32; 2]> = params
            .iter()
            .map(|p| match p.label {
                ParameterLabel::LabelOffsets(offsets) => offsets,
                ParameterLabel::Simple(_) => panic!("expected offsets"),
            })
            .collect();
        assert_eq!(offsets, vec![[5, 6], [8, 9]]);
        let [start, end] = offsets[1];
        let slice = String::from_utf16(&units[start as usize..end as usize]).expect("utf16");
        assert_eq!(slice, "β");
    }

    #[test]
    fn test_signature_help_active_parameter() {
        let tree = atan_call();
        let table = table();

        let first = tree.source().find("#2").expect("first param");
        let help = get_signature_help(&tree, first + 1, &table).expect("signature help");
        assert_eq!(labels(&help), vec!["ATAN[y]/[x]", "ATAN[y, x]"]);
        assert_eq!(help.active_parameter, Some(0));
        assert_eq!(help.active_signature, Some(0));

        let second = tree.source().find("#3").expect("second param");
        let help = get_signature_help(&tree, second + 1, &table).expect("signature help");
        assert_eq!(help.active_parameter, Some(1));
        // Both overloads take two parameters.
        assert_eq!(help.active_signature, Some(0));
    }

    #[test]
    fn test_no_help_outside_calls() {
        let tree = atan_call();
        assert!(get_signature_help(&tree, 0, &table()).is_none());
    }

    #[test]
    fn test_no_help_for_unknown_function() {
        let mut b = TreeBuilder::new(FileKind::Program);
        b.start(NodeKind::Call);
        b.token_field(NodeKind::Other, Field::Name, "FOO");
        b.trivia("[");
        b.start(NodeKind::CallParam);
        b.token(NodeKind::Numeric, "1");
        b.finish();
        b.trivia("]");
        let tree = b.build();
        assert!(get_signature_help(&tree, 5, &table()).is_none());
    }
}
