#![no_main]

use gosyntax::ast::TopLevelDecl;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    match gosyntax::parse_file(&s) {
        Ok((arena, file)) => {
            assert!(file.span.end as usize <= s.len());
            for decl in arena.top_decls(file.decls) {
                let span = match *decl {
                    TopLevelDecl::Gen(id) => arena.gen_decls.span(id),
                    TopLevelDecl::Func(id) => arena.funcs.span(id),
                };
                assert!(span.start <= span.end);
                assert!(span.end as usize <= s.len());
            }
        }
        Err(failure) => {
            assert!(!failure.diags.is_empty());
            for diag in &failure.diags {
                // Rendering clamps positions into the source.
                let _ = diag.render(&s);
            }
        }
    }
});
