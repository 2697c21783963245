pub mod probe;
pub mod result;

pub use probe::{Fetch, FetchRequest, HttpFetcher};
pub use result::{FetchError, FetchResponse};

/// Render an error together with its `source()` chain on a single line.
///
/// reqwest wraps the interesting part (`connection refused`, `dns error`, ...)
/// a few levels deep, so the top-level message alone is rarely useful in a record.
fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = err.to_string();
    while let Some(src) = err.source() {
        let cause = src.to_string();
        // hyper and reqwest sometimes repeat the inner message in the outer one
        if !s.ends_with(&cause) {
            s.push_str(": ");
            s.push_str(&cause);
        }
        err = src;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer {
        msg: &'static str,
        source: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.msg)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.source.as_deref().map(|e| e as _)
        }
    }

    #[test]
    fn report_joins_the_source_chain() {
        let err = Layer {
            msg: "error sending request",
            source: Some(Box::new(Layer {
                msg: "client error (Connect)",
                source: Some(Box::new(Layer {
                    msg: "connection refused",
                    source: None,
                })),
            })),
        };

        assert_eq!(
            report(&err),
            "error sending request: client error (Connect): connection refused"
        );
    }

    #[test]
    fn report_skips_repeated_causes() {
        let err = Layer {
            msg: "tcp connect error: connection refused",
            source: Some(Box::new(Layer {
                msg: "connection refused",
                source: None,
            })),
        };

        assert_eq!(report(&err), "tcp connect error: connection refused");
    }
}
