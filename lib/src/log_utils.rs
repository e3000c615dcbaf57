use std::fmt;
use smallvec::SmallVec;


/// A chain of scope identifiers used to correlate log lines belonging to
/// the same connection/request across modules.
#[derive(Debug, Clone, PartialEq)]
pub struct IdChain<T> {
    links: SmallVec<[T; 4]>,
}

impl<T> IdChain<T> {
    pub fn new(id: T) -> Self {
        let mut links = SmallVec::new();
        links.push(id);
        Self { links }
    }

    /// Derive a chain for a nested scope (e.g. a request within a connection).
    pub fn make_child(&self, id: T) -> Self
    where
        T: Clone,
    {
        let mut links = self.links.clone();
        links.push(id);
        Self { links }
    }
}

impl<T: fmt::Display> fmt::Display for IdChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.links.iter().enumerate() {
            if i > 0 {
                write!(f, "-")?;
            }
            write!(f, "{}", link)?;
        }
        Ok(())
    }
}

/// Emit a log line prefixed with an [`IdChain`].
#[macro_export]
macro_rules! log_id {
    ($level:ident, $id:expr, $fmt:literal $(, $args:expr)* $(,)?) => {
        log::$level!(concat!("[{}] ", $fmt), $id $(, $args)*)
    };
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_formats_links_in_order() {
        let chain = IdChain::new(7u64);
        assert_eq!(chain.to_string(), "7");
        let child = chain.make_child(42);
        assert_eq!(child.to_string(), "7-42");
        assert_eq!(chain.to_string(), "7");
    }
}
