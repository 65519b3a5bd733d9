/// The `(align, offset)` immediate pair carried by every load/store
/// instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemArg {
    /// Expected alignment, given as `log2` of the byte alignment.
    pub align: u32,
    /// Constant byte offset added to the dynamic address operand.
    pub offset: u32,
}
