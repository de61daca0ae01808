//! tests/translate.rs : traduction complète, texte C++ attendu à l'octet près.

use indoc::indoc;
use pretty_assertions::assert_eq;

use pyxc_compiler::{
    check_source, transpile_str, ErrorKind, InferredType, IntType, PrintArg, PrintSupport, TranspileConfig,
    Transpiler,
};

const EXAMPLE: &str = include_str!("../../../demos/example.py");

fn no_header() -> TranspileConfig {
    TranspileConfig {
        header_comment: false,
        ..TranspileConfig::default()
    }
}

#[test]
fn example_translates_to_expected_cpp() {
    let got = Transpiler::new(no_header()).transpile(EXAMPLE, "example.py").unwrap();
    let expected = indoc! {r#"
        #include <iostream>
        #include <string>

        int main() {
            long long a = 5;
            long long b = 10;
            if (a < b) {
                std::cout << "lt" << '\n';
            } else if (a == b) {
                std::cout << "eq" << '\n';
            } else {
                std::cout << "gt" << '\n';
            }
            long long option = 2;
            switch (option) {
            case 1: {
                std::cout << "one" << '\n';
                break;
            }
            case 2: {
                std::cout << "two" << '\n';
                break;
            }
            case 3: {
                std::cout << "three" << '\n';
                break;
            }
            default: {
                std::cout << "other" << '\n';
                break;
            }
            }
            std::cout << ((a < b) ? 1 : 0) << ' ' << ((a > b) ? 1 : 0) << ' ' << ((a <= b) ? 1 : 0) << ' ' << ((a >= b) ? 1 : 0) << ' ' << ((a == b) ? 1 : 0) << ' ' << ((a != b) ? 1 : 0) << '\n';
            std::cout << (((a < b) && (b > 0)) ? 1 : 0) << ' ' << (((a > b) || (b > 0)) ? 1 : 0) << '\n';
            a++;
            std::cout << a << '\n';
            long long i = 0;
            long long total = 0;
            while (i < 5) {
                i++;
                if ((i % 2) == 0) {
                    continue;
                }
                total = total + i;
            }
            std::cout << "total" << ' ' << total << '\n';
            for (long long k = 0; k < 3; ++k) {
                std::cout << "k" << ' ' << k << '\n';
            }
            return 0;
        }
    "#};
    assert_eq!(got, expected);
}

#[test]
fn translation_is_deterministic() {
    let first = transpile_str(EXAMPLE, "example.py").unwrap();
    for _ in 0..5 {
        assert_eq!(transpile_str(EXAMPLE, "example.py").unwrap(), first);
    }
}

#[test]
fn default_output_carries_a_header() {
    let got = transpile_str("x = 1\n", "x.py").unwrap();
    assert!(got.starts_with("// Generated by pyxc "), "{got}");
    assert!(got.lines().next().unwrap().ends_with("from x.py. Do not edit."));
}

#[test]
fn same_type_reassignment_does_not_redeclare() {
    let got = Transpiler::new(no_header()).transpile("n = 1\nn = n + 1\nn = 7\n", "n.py").unwrap();
    assert_eq!(got.matches("long long n").count(), 1, "{got}");
    assert!(got.contains("    n = n + 1;\n    n = 7;\n"), "{got}");
}

#[test]
fn config_changes_int_spelling_and_indent() {
    let config = TranspileConfig {
        indent_width: 2,
        int_type: IntType::Int64,
        header_comment: false,
    };
    let got = Transpiler::new(config).transpile("n = 1\nif n:\n    n--\n", "n.py").unwrap();
    assert_eq!(
        got,
        indoc! {"
            #include <iostream>
            #include <string>
            #include <cstdint>

            int main() {
              std::int64_t n = 1;
              if (n != 0) {
                n--;
              }
              return 0;
            }
        "}
    );
}

#[test]
fn int_spelling_refuses_literals_that_would_wrap() {
    let config = TranspileConfig {
        int_type: IntType::Int,
        ..no_header()
    };
    let t = Transpiler::new(config);
    let err = t.transpile("a = 3000000000\nprint(a)\n", "a.py").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    assert!(t.transpile("a = -2147483647\nprint(a)\n", "a.py").is_ok());
}

/// Support d'impression alternatif : `printf`.
struct PrintfSupport;

impl PrintSupport for PrintfSupport {
    fn includes(&self) -> &[&'static str] {
        &["<cstdio>"]
    }

    fn print_statement(&self, args: &[PrintArg<'_>]) -> String {
        let mut fmt = Vec::new();
        let mut vals = Vec::new();
        for arg in args {
            match arg.ty {
                InferredType::Text => {
                    fmt.push("%s");
                    vals.push(format!("std::string({}).c_str()", arg.text));
                }
                _ => {
                    fmt.push("%lld");
                    vals.push(format!("(long long)({})", arg.text));
                }
            }
        }
        let mut call = format!("std::printf(\"{}\\n\"", fmt.join(" "));
        for v in vals {
            call.push_str(", ");
            call.push_str(&v);
        }
        call.push_str(");");
        call
    }
}

#[test]
fn print_support_is_replaceable() {
    let t = Transpiler::new(no_header()).with_print_support(PrintfSupport);
    let got = t.transpile("a = 1\nprint(\"a\", a, a > 0)\n", "p.py").unwrap();
    assert!(got.starts_with("#include <cstdio>\n#include <string>\n"), "{got}");
    assert!(
        got.contains(r#"std::printf("%s %lld %lld\n", std::string("a").c_str(), (long long)(a), (long long)(a > 0));"#),
        "{got}"
    );
}

#[test]
fn checked_ast_serializes_with_types() {
    let program = check_source("flag = 1 < 2\n").unwrap();
    let json = serde_json::to_value(&program).unwrap();
    let assign = &json["body"]["stmts"][0]["Assign"];
    assert_eq!(assign["name"], "flag");
    assert_eq!(assign["binding"], "Declare");
    assert_eq!(assign["value"]["ty"], "Boolean");
}
