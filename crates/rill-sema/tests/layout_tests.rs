//! The recursive-unsized layout post-pass.

mod common;

use common::{codes, Fixture};
use rill_common::{Code, StringInterner};
use rill_sema::{LayoutEngine, TypeId, TypeInterner};

/// A layout engine that declares a two-type cycle, phrased differently
/// depending on which type it is asked about.
struct CyclicLayout;

impl LayoutEngine for CyclicLayout {
    fn unsized_cycle(
        &self,
        types: &TypeInterner,
        strings: &StringInterner,
        root: TypeId,
    ) -> Option<Vec<String>> {
        match types.type_key(root, strings).as_str() {
            "Tree" => Some(vec!["Tree".to_string(), "Branch".to_string()]),
            "Branch" => Some(vec!["Branch".to_string(), "Tree".to_string()]),
            _ => None,
        }
    }
}

/// The same cycle, reached from either participant, reports once and with
/// stable wording.
#[test]
fn cycle_reports_once_with_normalized_wording() {
    let mut f = Fixture::new();
    let branch_ty = f.t_path("Branch");
    f.struct_decl("Tree", vec![("left", branch_ty)]);
    let tree_ty = f.t_path("Tree");
    f.struct_decl("Branch", vec![("up", tree_ty)]);

    let (_, sink) = f.run_with(&CyclicLayout, &rill_sema::CheckOptions::default());
    assert_eq!(codes(&sink), vec![Code::RecursiveUnsized]);
    assert_eq!(
        sink.diagnostics[0].message,
        "recursive type without indirection: Branch -> Tree -> Branch"
    );
}

#[test]
fn finite_types_pass_layout() {
    let mut f = Fixture::new();
    let int_ty = f.t_path("int");
    f.struct_decl("Point", vec![("x", int_ty)]);

    let (_, sink) = f.run();
    assert!(sink.diagnostics.is_empty(), "{:?}", sink.diagnostics);
}
