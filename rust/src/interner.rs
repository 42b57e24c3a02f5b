//! String interning for operation and operator type names.
//!
//! Names are stored once and referenced by a compact `Symbol`, so entities can
//! be compared and hashed by integer instead of by string.

use rustc_hash::FxHashMap;

/// Interned name (u32 for compact storage and fast hashing).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// String interner that maps names to symbols and back.
#[derive(Debug, Clone)]
pub struct NameInterner {
    to_symbol: FxHashMap<String, Symbol>,
    from_symbol: Vec<String>,
}

impl NameInterner {
    /// Create a new interner with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_symbol: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_symbol: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning its symbol.
    /// If already interned, returns the existing symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&symbol) = self.to_symbol.get(s) {
            return symbol;
        }
        let symbol = Symbol(self.from_symbol.len() as u32);
        self.from_symbol.push(s.to_string());
        self.to_symbol.insert(s.to_string(), symbol);
        symbol
    }

    /// Get the symbol for a string, if it exists.
    #[inline]
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.to_symbol.get(s).copied()
    }

    /// Get the string for a symbol.
    #[inline]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.from_symbol.get(symbol.0 as usize).map(|s| s.as_str())
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.from_symbol.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.from_symbol.is_empty()
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
