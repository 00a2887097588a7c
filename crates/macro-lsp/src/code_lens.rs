//! Reference count lenses above declarations.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tower_lsp::lsp_types::{CodeLens, Command, Location, Range};

use macro_analyzer::{FileFilter, FileRecord, FileResolver};
use macro_syntax::{Field, NodeKind};

use crate::document::LineIndex;
use crate::navigation::location;

/// Client command the lenses invoke
pub const REFERENCES_COMMAND: &str = "macro.codelens.references";

/// One lens per declaration, counting its uses by name.
///
/// A program counts its own uses; a definition file counts the uses in every
/// program that includes it.
pub fn code_lenses(record: &Arc<FileRecord>, files: &dyn FileResolver) -> Vec<CodeLens> {
    let sources: Vec<Arc<FileRecord>> = if record.is_program() {
        vec![Arc::clone(record)]
    } else {
        files
            .get_all(&FileFilter::SourceFiles)
            .into_iter()
            .filter(|file| file.includes(&record.uri))
            .collect()
    };

    let mut uses: HashMap<String, Vec<Location>> = HashMap::new();
    for file in &sources {
        collect_uses(file, &mut uses);
    }

    let index = LineIndex::new(record.tree.source());
    let mut lenses = Vec::new();
    record.tree.root().accept(|node| {
        if !node.kind().is_declaration() {
            return true;
        }
        if let Some(name) = node.child_by_field(Field::Name).or_else(|| node.child(0)) {
            let locations = uses.get(name.text()).map(Vec::as_slice).unwrap_or_default();
            lenses.push(reference_lens(index.range(name.span()), locations));
        }
        false
    });
    lenses
}

/// Symbol and label uses by name, declarations excluded
fn collect_uses(file: &FileRecord, uses: &mut HashMap<String, Vec<Location>>) {
    let index = LineIndex::new(file.tree.source());
    file.tree.root().accept(|node| match node.kind() {
        NodeKind::VariableDef | NodeKind::LabelDef => false,
        NodeKind::Symbol | NodeKind::Label => {
            if let Some(location) = location(file, &index, node.span()) {
                uses.entry(node.text().to_string())
                    .or_default()
                    .push(location);
            }
            true
        }
        _ => true,
    });
}

fn reference_lens(range: Range, locations: &[Location]) -> CodeLens {
    let count = locations.len();
    let title = if count == 1 {
        "1 reference".to_string()
    } else {
        format!("{count} references")
    };
    CodeLens {
        range,
        command: Some(Command {
            title,
            command: REFERENCES_COMMAND.to_string(),
            arguments: Some(vec![json!(range.start.line), json!(range.start.character)]),
        }),
        data: Some(json!({ "count": count, "locations": locations })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{definitions, pos, program, store, DEFS, MAIN, OTHER};
    use macro_syntax::{TreeBuilder, ValueType};

    fn uses_symbol(b: &mut TreeBuilder, name: &str) {
        b.start(NodeKind::Statement);
        b.token(NodeKind::Code, "G01");
        b.trivia(" F");
        b.token(NodeKind::Symbol, name);
        b.finish();
        b.newline();
    }

    fn titles(lenses: &[CodeLens]) -> Vec<&str> {
        lenses
            .iter()
            .filter_map(|l| l.command.as_ref())
            .map(|c| c.title.as_str())
            .collect()
    }

    #[test]
    fn test_definition_file_counts_including_programs() {
        let defs = definitions(|b| {
            b.variable_def("FEED", "100", ValueType::Numeric);
            b.newline();
            b.variable_def("SPEED", "2000", ValueType::Numeric);
            b.newline();
            b.label_def("RETRY", "10", ValueType::Numeric);
            b.newline();
        });
        let main = program(|b| {
            b.include("defs.def");
            b.newline();
            uses_symbol(b, "FEED");
            uses_symbol(b, "FEED");
            uses_symbol(b, "SPEED");
        });
        let other = program(|b| {
            b.include("defs.def");
            b.newline();
            uses_symbol(b, "FEED");
        });
        // Uses in a program without the include do not count.
        let lonely = program(|b| uses_symbol(b, "FEED"));
        let files = store(vec![
            (DEFS, defs),
            (MAIN, main),
            (OTHER, other),
            ("file:///project/lonely.src", lonely),
        ]);
        let record = files.get(DEFS).expect("defs");
        let lenses = code_lenses(&record, &files);

        assert_eq!(
            titles(&lenses),
            vec!["3 references", "1 reference", "0 references"]
        );
        assert_eq!(lenses[0].range.start, pos(0, 1));
        let command = lenses[0].command.as_ref().expect("command");
        assert_eq!(command.command, REFERENCES_COMMAND);
        assert_eq!(command.arguments, Some(vec![json!(0), json!(1)]));

        let data = lenses[0].data.as_ref().expect("data");
        assert_eq!(data["count"], json!(3));
        assert_eq!(data["locations"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_program_counts_itself() {
        let main = program(|b| {
            b.variable_def("TOOL", "5", ValueType::Numeric);
            b.newline();
            uses_symbol(b, "TOOL");
            uses_symbol(b, "TOOL");
        });
        let other = program(|b| uses_symbol(b, "TOOL"));
        let files = store(vec![(MAIN, main), (OTHER, other)]);
        let record = files.get(MAIN).expect("main");
        assert_eq!(titles(&code_lenses(&record, &files)), vec!["2 references"]);
    }

    #[test]
    fn test_no_declarations_no_lenses() {
        let files = store(vec![(MAIN, program(|b| uses_symbol(b, "TOOL")))]);
        let record = files.get(MAIN).expect("main");
        assert!(code_lenses(&record, &files).is_empty());
    }
}
