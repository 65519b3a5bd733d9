use wsa_core::FuncType;
use wsa_ir::Instr;

/// A decoded Wasm module: its type table and its function vector.
///
/// The function vector interleaves imports (first, in import-section
/// order) and locally defined functions (in function-section order); this
/// matches the order the binary format itself uses for indexing, so a
/// function's index here is its Wasm function index.
#[derive(Debug, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    pub functions: Vec<Function>,
}

impl Module {
    /// Iterates the non-imported functions, the only ones the CFG
    /// reconstructor (and everything downstream of it) operates on.
    pub fn defined_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_import)
    }
}

/// A single function: its signature, provenance flags, and — if not
/// imported — its instruction list.
#[derive(Debug)]
pub struct Function {
    pub ty: FuncType,
    pub is_import: bool,
    pub is_export: bool,
    /// Empty for imported functions.
    pub instrs: Vec<Instr>,
}

impl Function {
    pub fn imported(ty: FuncType) -> Self {
        Self {
            ty,
            is_import: true,
            is_export: false,
            instrs: Vec::new(),
        }
    }

    pub fn defined(ty: FuncType, instrs: Vec<Instr>) -> Self {
        Self {
            ty,
            is_import: false,
            is_export: false,
            instrs,
        }
    }
}
