use log::debug;

use super::BuiltInType;

#[derive(Clone, Debug, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    /// Scalar type, element type of an array, or the formal parameter types of a function.
    pub ty: Vec<BuiltInType>,
    pub is_func: bool,
    pub has_return: bool,
    pub offset: i32,
    pub return_type: BuiltInType,
    pub is_formal: bool,
    pub array_size: Option<usize>,
    /// Register holding the stack address of the value. Empty for functions.
    pub storage: String,
}

impl SymbolEntry {
    pub fn variable(name: &str, ty: BuiltInType, storage: String) -> Self {
        Self {
            name: name.to_string(),
            ty: vec![ty],
            is_func: false,
            has_return: false,
            offset: 0,
            return_type: BuiltInType::Void,
            is_formal: false,
            array_size: None,
            storage,
        }
    }

    pub fn array(name: &str, elem: BuiltInType, size: usize, storage: String) -> Self {
        Self {
            array_size: Some(size),
            ..Self::variable(name, elem, storage)
        }
    }

    pub fn formal(name: &str, ty: BuiltInType, storage: String) -> Self {
        Self {
            is_formal: true,
            ..Self::variable(name, ty, storage)
        }
    }

    pub fn function(name: &str, params: Vec<BuiltInType>, return_type: BuiltInType) -> Self {
        Self {
            name: name.to_string(),
            ty: params,
            is_func: true,
            has_return: true,
            offset: 0,
            return_type,
            is_formal: false,
            array_size: None,
            storage: String::new(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_size.is_some()
    }

    /// Type of the value the name denotes when used as an expression.
    pub fn value_type(&self) -> BuiltInType {
        self.ty.first().copied().unwrap_or(BuiltInType::Void)
    }

    fn slots(&self) -> i32 {
        self.array_size
            .map_or(1, |size| i32::try_from(size).unwrap_or(i32::MAX))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scope {
    entries: Vec<SymbolEntry>,
    is_loop: bool,
}

impl Scope {
    fn find(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }
}

/// Stack of lexical scopes. Scope 0 is the global scope and holds every function.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    offsets: Vec<i32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            offsets: vec![0],
        }
    }

    pub fn begin_scope(&mut self) {
        self.push_scope(false);
    }

    pub fn begin_loop_scope(&mut self) {
        self.push_scope(true);
    }

    fn push_scope(&mut self, is_loop: bool) {
        let inherited = self.offset();
        self.scopes.push(Scope {
            entries: vec![],
            is_loop,
        });
        self.offsets.push(inherited);
        debug!(
            "begin scope {} (loop: {}, offset: {})",
            self.depth(),
            is_loop,
            inherited
        );
    }

    pub fn end_scope(&mut self) {
        if self.scopes.len() == 1 {
            return;
        }
        let scope = self.scopes.pop();
        self.offsets.pop();
        debug!(
            "end scope {} ({} entries)",
            self.depth() + 1,
            scope.map_or(0, |s| s.entries.len())
        );
    }

    /// Inserts `entry` and returns the offset it was assigned.
    ///
    /// Formals count down from -1 within their scope and leave the local offset alone.
    pub fn add_entry(&mut self, mut entry: SymbolEntry) -> i32 {
        if entry.is_func {
            self.scopes[0].entries.push(entry);
            return 0;
        }

        if entry.is_formal {
            entry.offset = self.formal_offset();
        } else {
            entry.offset = self.offset();
            self.set_offset(entry.offset.saturating_add(entry.slots()));
        }

        let offset = entry.offset;
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries.push(entry);
        }
        offset
    }

    pub fn find_entry(&self, name: &str, is_function: bool) -> Option<&SymbolEntry> {
        self.scopes
            .iter()
            .rev()
            .filter_map(|scope| scope.find(name))
            .find(|entry| entry.is_func == is_function)
    }

    pub fn contains(&self, name: &str, is_function: bool) -> bool {
        self.find_entry(name, is_function).is_some()
    }

    /// Whether `name` is taken in either namespace.
    pub fn is_defined(&self, name: &str) -> bool {
        self.contains(name, false) || self.contains(name, true)
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn in_loop(&self) -> bool {
        self.scopes.iter().any(Scope::is_loop)
    }

    /// Offset the next declared name in the current scope will receive.
    pub fn offset(&self) -> i32 {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Offset the next formal parameter bound in the current scope will receive.
    pub fn formal_offset(&self) -> i32 {
        let bound = self
            .scopes
            .last()
            .map_or(0, |scope| scope.entries.iter().filter(|e| e.is_formal).count());
        i32::try_from(bound).map_or(i32::MIN, |n| -1 - n)
    }

    pub fn set_offset(&mut self, offset: i32) {
        if let Some(current) = self.offsets.last_mut() {
            *current = offset;
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
