pub mod debug;
pub mod proto;
pub mod value;
pub mod vm;

// Re-export commonly used types for convenience
pub use debug::{DebugRecord, Frame, InfoMask, LocalSlot, Target};
pub use proto::{Constant, Instruction, LocalVar, Proto, ProtoBuilder};
pub use value::{Function, FunctionRef, TableRef, Upvalue, Value};
pub use vm::{DebugConfig, ExecutionContext, MainChunkPolicy, VmError};
