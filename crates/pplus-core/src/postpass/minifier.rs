//! PPL minifier.
//!
//! Comments and layout go, `LOCAL` variables of three or more characters
//! become `vN` within each top level `BEGIN ... END` block, and `LOCAL`
//! functions become `fnN`. Minifying minified text changes nothing.

use std::collections::{HashMap, HashSet};

use regex::Captures;

use super::{replace_words, segments, words, Segment};
use crate::desugar::auto::base32;
use crate::desugar::split_top_level;
use crate::nesting::top_level_blocks;
use crate::pattern::is_word_char;
use crate::strings::{split_comment, ProtectedStrings};

pub fn minify(text: &str) -> String {
    let mut parts: Vec<Segment> = segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Code(code) => Segment::Code(minify_code(&code)),
            verbatim => verbatim,
        })
        .collect();
    rename_local_functions(&mut parts);

    let mut out = String::with_capacity(text.len());
    for part in parts {
        match part {
            Segment::Verbatim(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            Segment::Code(code) => {
                let code = code.trim_matches('\n');
                if !code.is_empty() {
                    out.push_str(code);
                    out.push('\n');
                }
            }
        }
    }
    out
}

fn minify_code(code: &str) -> String {
    let code = code
        .lines()
        .map(|line| split_comment(line).0)
        .collect::<Vec<_>>()
        .join("\n");

    let mut strings = ProtectedStrings::new();
    let mut text = strings.protect(&code);
    text = shorten_variable_names(&text);
    text = replace_words(&text, &HashMap::from([("FROM".to_string(), ":=".to_string())]));
    text = clean_whitespace(&text);
    text = fix_unary_minus(&text);
    text = collapse_zero_padding(&text);
    text = static_regex!(r";\s*").replace_all(&text, ";").into_owned();
    text = static_regex!(r"\n{2,}").replace_all(&text, "\n").into_owned();
    strings.restore(&text)
}

fn shorten_variable_names(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in top_level_blocks(text) {
        out.push_str(&text[cursor..start]);
        out.push_str(&shorten_block(&text[start..end]));
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn shorten_block(block: &str) -> String {
    let used: HashSet<&str> = words(block).collect();
    let mut renames = HashMap::new();
    let mut counter = 0usize;

    for caps in static_regex!(r"\bLOCAL\s+([^;]*)").captures_iter(block) {
        for item in split_top_level(&caps[1], ',') {
            let Some(name) = static_regex!(r"^\s*([A-Za-z_]\w*)").captures(item).map(|c| c[1].to_string()) else {
                continue;
            };
            if name.chars().count() < 3 || static_regex!(r"^v\d+$").is_match(&name) || renames.contains_key(&name) {
                continue;
            }
            let short = loop {
                counter += 1;
                let candidate = format!("v{counter}");
                if !used.contains(candidate.as_str()) {
                    break candidate;
                }
            };
            renames.insert(name, short);
        }
    }

    replace_words(block, &renames)
}

/// Give file level `LOCAL` functions short generated names
fn rename_local_functions(parts: &mut [Segment]) {
    let code: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            Segment::Code(code) => Some(code.as_str()),
            Segment::Verbatim(_) => None,
        })
        .collect();
    let used: HashSet<&str> = code.iter().copied().flat_map(words).collect();

    let mut renames = HashMap::new();
    let mut counter = 0usize;
    for text in &code {
        for caps in static_regex!(r"\bLOCAL\s+([A-Za-z]\w*)\s*\(").captures_iter(text) {
            let name = &caps[1];
            if static_regex!(r"^fn[0-9A-Za-h]+$").is_match(name) || renames.contains_key(name) {
                continue;
            }
            let short = loop {
                let candidate = format!("fn{}", base32(counter));
                counter += 1;
                if !used.contains(candidate.as_str()) {
                    break candidate;
                }
            };
            renames.insert(name.to_string(), short);
        }
    }

    for part in parts.iter_mut() {
        if let Segment::Code(code) = part {
            *code = replace_words(code, &renames);
        }
    }
}

/// Drop whitespace except a single space between two words
fn clean_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\n' {
            pending = true;
            continue;
        }
        // `UNTIL (x)` must not become `UNTIL(x)`
        if pending && (is_word_char(c) || c == '(') && out.ends_with(is_word_char) {
            out.push(' ');
        }
        pending = false;
        out.push(c);
    }
    out
}

/// `a - -b` to `a- -b` and `- x` to `-x`
fn fix_unary_minus(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let is_target = |c: &char| c.is_ascii_alphanumeric() || *c == '.';
    let skip_spaces = |mut j: usize| {
        while chars.get(j).is_some_and(|c| *c == ' ') {
            j += 1;
        }
        j
    };

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '-' | '+' | '*' | '/') && chars.get(i + 1) == Some(&'-') {
            let j = skip_spaces(i + 2);
            if chars.get(j).is_some_and(is_target) {
                out.push(c);
                out.push_str(" -");
                i += 2;
                continue;
            }
        }
        if c == '-' {
            let j = skip_spaces(i + 1);
            if j > i + 1 && chars.get(j).is_some_and(is_target) {
                out.push('-');
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// `007` to `7` and `2.50` to `2.5`, leaving `#` literals alone
fn collapse_zero_padding(text: &str) -> String {
    static_regex!(r"(^|[^\w#.])(\d+(?:\.\d+)?)\b")
        .replace_all(text, |caps: &Captures| format!("{}{}", &caps[1], trim_number(&caps[2])))
        .into_owned()
}

fn trim_number(number: &str) -> String {
    let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
    let integer = match integer.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROGRAM: &str = "\
EXPORT main()
BEGIN
  LOCAL count := 0, total;
  FOR count FROM 1 TO 10 DO
    total := total + count * 2.50; // accumulate
  END;
  PRINT(\"count = \" + total);
  RETURN -1;
END;
";

    #[test]
    fn test_minify_program() {
        assert_eq!(
            minify(PROGRAM),
            "EXPORT main()\nBEGIN\nLOCAL v1:=0,v2;FOR v1:=1 TO 10 DO\nv2:=v2+v1*2.5;END;PRINT(\"count = \"+v2);RETURN-1;END;\n"
        );
    }

    #[test]
    fn test_minify_is_stable() {
        let once = minify(PROGRAM);
        assert_eq!(minify(&once), once);
    }

    #[test]
    fn test_local_functions_are_renamed() {
        let program = "LOCAL helper(x);\nEXPORT main()\nBEGIN\n  RETURN helper(2);\nEND;\nhelper(x)\nBEGIN\n  RETURN x * 2;\nEND;\n";
        let once = minify(program);
        assert_eq!(
            once,
            "LOCAL fn0(x);EXPORT main()\nBEGIN\nRETURN fn0(2);END;fn0(x)\nBEGIN\nRETURN x*2;END;\n"
        );
        assert_eq!(minify(&once), once);
    }

    #[test]
    fn test_generated_names_avoid_existing_ones() {
        assert_eq!(
            shorten_block("BEGIN LOCAL v1, value; RETURN value + v1; END;"),
            "BEGIN LOCAL v1, v2; RETURN v2 + v1; END;"
        );
    }

    #[test]
    fn test_python_blocks_are_untouched() {
        let program = "#PYTHON\ndef  f( total ):\n    return total\n#END\nBEGIN\n  LOCAL total := 1;\nEND;\n";
        assert_eq!(
            minify(program),
            "#PYTHON\ndef  f( total ):\n    return total\n#END\nBEGIN\nLOCAL v1:=1;END;\n"
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(fix_unary_minus("a- -b"), "a- -b");
        assert_eq!(fix_unary_minus("a--b"), "a- -b");
        assert_eq!(fix_unary_minus("x:=- 5"), "x:=-5");
        assert_eq!(collapse_zero_padding("x:=007+0.50+#00FF:16h+v01"), "x:=7+0.5+#00FF:16h+v01");
        assert_eq!(clean_whitespace("REPEAT x := x + 1; UNTIL (x > 3);"), "REPEAT x:=x+1;UNTIL (x>3);");
    }
}
