/*!
# Translator

Runs one compilation over P+ source, line by line:

1. directives, embedded `#PYTHON`/`#PPL` blocks and `/* ... */` comments
2. pattern rules and code stack tokens
3. `def`, `alias`, `dict` and namespace statements
4. alias and macro substitution, inline expression folding
5. the structural desugarers
6. block depth tracking, purging scoped aliases and rules on the way out
7. layout: one statement per line, indented by depth

Includes are translated in place by recursion. A failure to read a file or
an include cycle aborts the run; every other problem is a diagnostic.
*/

mod driver;

pub use driver::{compile_to_file, CompileSummary};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::calc;
use crate::context::CompilerContext;
use crate::desugar::{
    split_top_level, AliasStatement, AutoNaming, CodeStack, Def, DesugarStats, Dictionary, Enums,
    ForNext, Ifte, Namespaces, Operators, Structs, Sugar, Switch,
};
use crate::diagnostics::Diagnostics;
use crate::error::PplusError;
use crate::nesting::{self, analyze_line, BlockToken};
use crate::output;
use crate::postpass;
use crate::preprocessor::{Directive, Preprocessor};
use crate::strings::{collapse_whitespace, expand_tabs, split_comment, ProtectedStrings};
use crate::{PplusConfig, Result};

/// Emitted first when the pragma preamble is enabled
pub const PRAGMA_PREAMBLE: &str = "#pragma mode( separator(.,;) integer(h64) )";

/// The result of a finished compilation
#[derive(Debug)]
pub struct Translation {
    /// Generated PPL
    pub text: String,
    pub diagnostics: Diagnostics,
    pub stats: DesugarStats,
}

impl Translation {
    /// True when an Error or Critical diagnostic was recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn to_utf16le(&self) -> Vec<u8> {
        output::encode_utf16le(&self.text)
    }
}

/// Line translator holding all state of one compilation
#[derive(Debug)]
pub struct Translator {
    ctx: CompilerContext,
    preprocessor: Preprocessor,
    stats: DesugarStats,

    def: Def,
    alias: AliasStatement,
    namespaces: Namespaces,
    dictionary: Dictionary,
    code_stack: CodeStack,
    structs: Structs,
    enums: Enums,
    auto: AutoNaming,
    switch: Switch,
    for_next: ForNext,
    ifte: Ifte,
    sugar: Sugar,
    operators: Operators,

    output: String,
    lines: usize,
    in_comment: bool,
    blank_run: bool,
}

impl Translator {
    pub fn new(config: PplusConfig) -> Self {
        let mut translator = Self {
            ctx: CompilerContext::new(config),
            preprocessor: Preprocessor::new(),
            stats: DesugarStats::new(),
            def: Def::new(),
            alias: AliasStatement::new(),
            namespaces: Namespaces::new(),
            dictionary: Dictionary::new(),
            code_stack: CodeStack::new(),
            structs: Structs::new(),
            enums: Enums::new(),
            auto: AutoNaming::new(),
            switch: Switch::new(),
            for_next: ForNext::new(),
            ifte: Ifte::new(),
            sugar: Sugar::new(),
            operators: Operators::new(),
            output: String::new(),
            lines: 0,
            in_comment: false,
            blank_run: true,
        };
        translator.predefine();
        translator
    }

    fn predefine(&mut self) {
        let version = format!(
            "{}.{}",
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR")
        );
        let defines = [
            "#define __pplus".to_string(),
            "#define __SCREEN G0".to_string(),
            "#define __LIST_LIMIT 10000".to_string(),
            format!("#define __VERSION {version}"),
        ];
        for define in defines {
            self.preprocessor.parse(&define, &mut self.ctx);
        }
    }

    pub fn context(&self) -> &CompilerContext {
        &self.ctx
    }

    /// PPL generated so far
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Translate a P+ file, including whatever it includes
    pub fn translate_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                let error = PplusError::io(path, e);
                self.ctx.critical(error.to_string());
                return Err(error);
            }
        };
        debug!("translating {}", path.display());
        self.translate_source(path, &source)
    }

    /// Translate P+ text that does not come from a file
    pub fn translate_str(&mut self, source: &str) -> Result<()> {
        self.translate_source(PathBuf::new(), source)
    }

    fn translate_source(&mut self, path: impl Into<PathBuf>, source: &str) -> Result<()> {
        self.ctx.push_source(path);
        let result = source.lines().try_for_each(|line| self.translate_line(line));
        self.ctx.pop_source();
        result
    }

    fn translate_line(&mut self, raw: &str) -> Result<()> {
        self.ctx.next_line();
        self.lines += 1;
        let expanded = expand_tabs(raw, self.ctx.config.tab_width);
        let trimmed = expanded.trim();

        if self.in_comment {
            self.in_comment = !trimmed.ends_with("*/");
            return Ok(());
        }

        match self.preprocessor.parse(trimmed, &mut self.ctx) {
            Directive::None => {}
            Directive::Consumed => return Ok(()),
            Directive::Include(path) => return self.include(&path),
            Directive::PassThrough(text) => {
                self.push_line(&text);
                return Ok(());
            }
            Directive::EmbeddedStart(_) => {
                if !self.preprocessor.disregard() {
                    self.push_line(trimmed);
                }
                return Ok(());
            }
            Directive::EmbeddedEnd(_) => {
                if !self.preprocessor.disregard() {
                    self.push_line("#END");
                }
                return Ok(());
            }
        }

        if self.preprocessor.embedded().is_some() {
            if !self.preprocessor.disregard() {
                self.push_line(raw.trim_end_matches(['\r', '\n']));
            }
            return Ok(());
        }
        if self.preprocessor.disregard() {
            return Ok(());
        }

        if let Some(rest) = trimmed.strip_prefix("/*") {
            self.in_comment = !rest.ends_with("*/");
            return Ok(());
        }

        if trimmed.is_empty() {
            if !self.blank_run {
                self.push_line("");
            }
            return Ok(());
        }

        if trimmed.starts_with("//") {
            let indent = self.indent(self.ctx.depth());
            self.push_line(&format!("{indent}{trimmed}"));
            return Ok(());
        }

        let site = self.ctx.site();
        if self.ctx.regexps.parse(trimmed, &site, &mut self.ctx.diagnostics) {
            return Ok(());
        }

        self.translate_code(trimmed);
        Ok(())
    }

    fn include(&mut self, path: &Path) -> Result<()> {
        if self.ctx.is_reading(path) {
            let error = PplusError::IncludeCycle {
                path: path.to_path_buf(),
            };
            self.ctx.critical(error.to_string());
            return Err(error);
        }
        debug!("including {}", path.display());
        self.translate_file(path)
    }

    fn translate_code(&mut self, text: &str) {
        let location = self.ctx.location();
        let mut line = self.ctx.regexps.resolve_all_regular_expressions(
            text,
            self.ctx.depth(),
            &mut self.ctx.diagnostics,
            &location,
        );
        self.stats.run(&mut self.code_stack, &mut line, &mut self.ctx);

        let (code, comment) = split_comment(&line);
        let comment = comment.map(str::to_string);
        let mut line = code.trim().to_string();
        if line.is_empty() {
            if let Some(comment) = comment {
                let indent = self.indent(self.ctx.depth());
                self.push_line(&format!("{indent}{comment}"));
            }
            return;
        }

        // statements that only declare something emit nothing
        let declared = self.stats.run(&mut self.def, &mut line, &mut self.ctx)
            || self.stats.run(&mut self.alias, &mut line, &mut self.ctx)
            || self.stats.run(&mut self.dictionary, &mut line, &mut self.ctx)
            || self.stats.run(&mut self.namespaces, &mut line, &mut self.ctx);
        if declared && line.trim().is_empty() {
            return;
        }

        let mut strings = ProtectedStrings::new();
        line = collapse_whitespace(&strings.protect(&line));
        line = self
            .ctx
            .aliases
            .resolve_all_aliases_in_text(&line, &mut self.ctx.diagnostics, &location);
        line = calc::fold_inline_expressions(&line, &mut self.ctx.diagnostics, &location);
        line = strings.protect(&line);

        let declared = self.stats.run(&mut self.structs, &mut line, &mut self.ctx)
            || self.stats.run(&mut self.enums, &mut line, &mut self.ctx);
        if declared && line.trim().is_empty() {
            return;
        }

        self.stats.run(&mut self.auto, &mut line, &mut self.ctx);
        self.stats.run(&mut self.switch, &mut line, &mut self.ctx);
        self.stats.run(&mut self.for_next, &mut line, &mut self.ctx);
        self.stats.run(&mut self.ifte, &mut line, &mut self.ctx);
        self.stats.run(&mut self.sugar, &mut line, &mut self.ctx);
        self.stats.run(&mut self.operators, &mut line, &mut self.ctx);

        let depth = self.ctx.depth();
        self.update_depth(&line);
        self.layout(&line, depth, &strings, comment.as_deref());
    }

    /// Follow the block keywords of a translated line
    fn update_depth(&mut self, line: &str) {
        let mut back_at_file_level = false;
        for token in nesting::scan(line) {
            match token.token {
                BlockToken::Open => self.ctx.increase_depth(),
                BlockToken::Close => {
                    if self.ctx.decrease_depth() && self.ctx.depth() == 0 {
                        back_at_file_level = true;
                    }
                }
                BlockToken::Else => {}
            }
        }

        if back_at_file_level && self.ctx.depth() == 0 {
            self.structs.remove_local_structs();
            self.switch.reset();
            self.for_next.reset();
            self.auto.reset_locals();
        }
    }

    /// Emit `line` one statement per line, indented from `depth`
    fn layout(&mut self, line: &str, depth: usize, strings: &ProtectedStrings, comment: Option<&str>) {
        let mut statements = Vec::new();
        for physical in line.split('\n') {
            let tidy = tidy_punctuation(physical);
            let parts = split_top_level(&tidy, ';');
            let last = parts.len() - 1;
            for (i, part) in parts.iter().enumerate() {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                statements.push(if i < last {
                    format!("{part};")
                } else {
                    part.to_string()
                });
            }
        }

        let count = statements.len();
        let mut running = depth;
        for (i, statement) in statements.iter().enumerate() {
            let nesting = analyze_line(statement);
            let indent = self.indent(nesting.indent_level(running));
            running = nesting.depth_after(running);

            let mut text = format!("{indent}{}", strings.restore(statement));
            if let Some(comment) = comment.filter(|_| i + 1 == count) {
                text.push(' ');
                text.push_str(comment);
            }
            self.push_line(&text);
        }
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(level * self.ctx.config.indent_width)
    }

    fn push_line(&mut self, text: &str) {
        self.blank_run = text.trim().is_empty();
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Finish the run: check for unclosed blocks and apply the post-passes
    pub fn finish(mut self) -> Translation {
        let depth = self.ctx.depth();
        if depth > 0 {
            self.ctx.warning(format!("{depth} block(s) still open at end of input"));
        }
        if let Some(language) = self.preprocessor.embedded() {
            self.ctx.warning(format!("{} block without #END", language.marker()));
        }

        let config = &self.ctx.config;
        let mut text = self.output;
        if config.pragma_preamble {
            text.insert(0, '\n');
            text.insert_str(0, PRAGMA_PREAMBLE);
        }
        if config.reformat {
            text = postpass::reformat(&text, config.indent_width);
        }
        if config.minify {
            text = postpass::minify(&text);
        }

        for rule in self.stats.iter() {
            debug!(
                "{}: applied {} times, {} lines consumed",
                rule.rule_name, rule.applications, rule.lines_consumed
            );
        }
        info!(
            "translated {} lines, {} desugarings, {} diagnostics",
            self.lines,
            self.stats.total_applications(),
            self.ctx.diagnostics.len()
        );

        Translation {
            text,
            diagnostics: self.ctx.diagnostics,
            stats: self.stats,
        }
    }
}

/// Normalize spacing around `:=`, separators and parentheses
fn tidy_punctuation(line: &str) -> String {
    let line = static_regex!(r"\s*:=\s*").replace_all(line, " := ");
    let line = static_regex!(r"\s+([;,)])").replace_all(&line, "$1");
    let line = static_regex!(r"\(\s+").replace_all(&line, "(");
    line.trim().to_string()
}

/// Translate P+ source text
pub fn compile_str(source: &str, config: PplusConfig) -> Result<Translation> {
    let mut translator = Translator::new(config);
    translator.translate_str(source)?;
    Ok(translator.finish())
}

/// Translate a P+ file
pub fn compile_file(path: impl AsRef<Path>, config: PplusConfig) -> Result<Translation> {
    let mut translator = Translator::new(config);
    translator.translate_file(path)?;
    Ok(translator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Translation {
        compile_str(source, PplusConfig::default()).unwrap()
    }

    #[test]
    fn test_blocks_are_indented() {
        let translation = compile("export main()\nbegin\nlocal a := 1;\nif a > 0 then\nreturn a;\nend;\nend;");
        assert_eq!(
            translation.text,
            "EXPORT main()\nBEGIN\n  LOCAL a := 1;\n  IF a > 0 THEN\n    RETURN a;\n  END;\nEND;\n"
        );
        assert!(!translation.has_errors());
    }

    #[test]
    fn test_statements_are_split() {
        let translation = compile("begin\nx := 1; y := 2;\nend;");
        assert_eq!(translation.text, "BEGIN\n  x := 1;\n  y := 2;\nEND;\n");
    }

    #[test]
    fn test_strings_and_comments_survive() {
        let translation = compile("begin\nPRINT(\"if a = b\"); // say it\nend;");
        assert_eq!(translation.text, "BEGIN\n  PRINT(\"if a = b\"); // say it\nEND;\n");
    }

    #[test]
    fn test_string_literals_survive_aliases() {
        let translation = compile("alias @ s2 := T;\nbegin\nPRINT(\"a // b\"); // c\nlocal s := \"x;y\";\ns2 := 1;\nend;");
        assert_eq!(
            translation.text,
            "BEGIN\n  PRINT(\"a // b\"); // c\n  LOCAL s := \"x;y\";\n  T := 1;\nEND;\n"
        );
        assert!(!translation.has_errors());
    }

    #[test]
    fn test_blank_lines_collapse() {
        let translation = compile("a := 1;\n\n\n\nb := 2;");
        assert_eq!(translation.text, "a := 1;\n\nb := 2;\n");
    }

    #[test]
    fn test_multiline_comments_are_dropped() {
        let translation = compile("/* header\n   more\n*/\na := 1;\n/* one line */\nb := 2;");
        assert_eq!(translation.text, "a := 1;\nb := 2;\n");
    }

    #[test]
    fn test_embedded_python_passes_through() {
        let translation = compile("#PYTHON name\nif a = b:\n    print(a)\n#END\nx := 1;");
        assert_eq!(translation.text, "#PYTHON name\nif a = b:\n    print(a)\n#END\nx := 1;\n");
    }

    #[test]
    fn test_predefined_macros() {
        let translation = compile("#ifdef __pplus\ns := __SCREEN;\n#endif");
        assert_eq!(translation.text, "s := G0;\n");
    }

    #[test]
    fn test_pragma_preamble() {
        let config = PplusConfig {
            pragma_preamble: true,
            ..PplusConfig::default()
        };
        let translation = compile_str("a := 1;", config).unwrap();
        assert_eq!(translation.text, format!("{PRAGMA_PREAMBLE}\na := 1;\n"));
    }

    #[test]
    fn test_unbalanced_end_is_an_error() {
        let translation = compile("end;");
        assert!(translation.has_errors());
        assert_eq!(translation.diagnostics.count(Severity::Error), 1);
    }

    #[test]
    fn test_open_block_is_reported() {
        let translation = compile("begin\nx := 1;");
        assert_eq!(translation.diagnostics.count(Severity::Warning), 1);
        assert!(!translation.has_errors());
    }

    #[test]
    fn test_missing_file_is_critical() {
        let mut translator = Translator::new(PplusConfig::default());
        let result = translator.translate_file("/nonexistent/program.pp");
        assert!(matches!(result, Err(PplusError::Io { .. })));
        assert_eq!(translator.context().diagnostics.count(Severity::Critical), 1);
    }

    #[test]
    fn test_stats_are_collected() {
        let translation = compile("begin\nvar count:n := 0;\nn += 1;\nend;");
        assert_eq!(translation.text, "BEGIN\n  LOCAL count := 0;\n  count := count + 1;\nEND;\n");
        assert_eq!(translation.stats.get("auto").map(|s| s.applications), Some(1));
        assert!(translation.stats.get("operators").is_some());
    }
}
