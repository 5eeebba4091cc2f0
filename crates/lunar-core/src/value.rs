//! Runtime values for the Lunar VM
//!
//! Reference categories (tables, functions, userdata, threads) are shared through `Rc` and
//! compare by identity. Primitive categories are stored inline.

use crate::proto::Proto;
use crate::vm::{ExecutionContext, VmError};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type TableRef = Rc<RefCell<Table>>;
pub type FunctionRef = Rc<Function>;
pub type UserdataRef = Rc<RefCell<Userdata>>;
pub type ThreadRef = Rc<RefCell<ThreadHandle>>;

/// Signature of a host-implemented function.
pub type NativeFn = fn(&mut ExecutionContext, &[Value]) -> Result<Vec<Value>, VmError>;

/// An upvalue is a variable captured by a closure.
/// Every closure that captured the same variable holds a clone of the same cell.
#[derive(Debug, Clone)]
pub struct Upvalue {
    pub value: Rc<RefCell<Value>>,
}

impl Upvalue {
    pub fn new(value: Value) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    /// True when both handles refer to the same captured variable
    pub fn ptr_eq(&self, other: &Upvalue) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

/// The category of a value, as reported by `type()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
    Userdata,
    Thread,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Nil => "nil",
            Category::Boolean => "boolean",
            Category::Number => "number",
            Category::String => "string",
            Category::Table => "table",
            Category::Function => "function",
            Category::Userdata => "userdata",
            Category::Thread => "thread",
        }
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Table(TableRef),
    Function(FunctionRef),
    Userdata(UserdataRef),
    Thread(ThreadRef),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Allocate a fresh empty table value
    pub fn new_table() -> Self {
        Value::Table(Table::new_ref())
    }

    pub fn category(&self) -> Category {
        match self {
            Value::Nil => Category::Nil,
            Value::Boolean(_) => Category::Boolean,
            Value::Number(_) => Category::Number,
            Value::String(_) => Category::String,
            Value::Table(_) => Category::Table,
            Value::Function(_) => Category::Function,
            Value::Userdata(_) => Category::Userdata,
            Value::Thread(_) => Category::Thread,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.category().name()
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Address of the referenced object, used for identity display
    fn address(&self) -> Option<*const ()> {
        match self {
            Value::Table(t) => Some(Rc::as_ptr(t) as *const ()),
            Value::Function(f) => Some(Rc::as_ptr(f) as *const ()),
            Value::Userdata(u) => Some(Rc::as_ptr(u) as *const ()),
            Value::Thread(t) => Some(Rc::as_ptr(t) as *const ()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Userdata(a), Value::Userdata(b)) => Rc::ptr_eq(a, b),
            (Value::Thread(a), Value::Thread(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<TableRef> for Value {
    fn from(t: TableRef) -> Self {
        Value::Table(t)
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Value::Function(f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => {
                // Format numbers nicely - remove .0 for whole numbers
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::Function(func) if func.is_native() => {
                write!(f, "function: builtin: {:p}", Rc::as_ptr(func))
            }
            other => {
                let addr = other.address().unwrap_or(std::ptr::null());
                write!(f, "{}: {:p}", other.type_name(), addr)
            }
        }
    }
}

// Tables may reference themselves through metatables, so Debug never recurses. Reference
// slots on the objects below print as addresses for the same reason.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            other => write!(f, "{other}"),
        }
    }
}

/// Address of an optional table slot for `Debug` output
fn table_ptr(slot: &Option<TableRef>) -> Option<*const RefCell<Table>> {
    slot.as_ref().map(Rc::as_ptr)
}

/// A table with a string-keyed hash part and a sequence part.
#[derive(Default)]
pub struct Table {
    pub entries: HashMap<String, Value>,
    pub array: Vec<Value>,
    pub metatable: Option<TableRef>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("entries", &self.entries)
            .field("array", &self.array)
            .field("metatable", &table_ptr(&self.metatable))
            .finish()
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_ref() -> TableRef {
        Rc::new(RefCell::new(Table::new()))
    }

    pub fn get(&self, key: &str) -> Value {
        self.entries.get(key).cloned().unwrap_or(Value::Nil)
    }

    /// Assigning nil removes the key
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_nil() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn push(&mut self, value: Value) {
        self.array.push(value);
    }

    /// Length of the sequence part
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.entries.is_empty()
    }
}

/// A closure compiled by the VM: a prototype plus its captured cells.
#[derive(Debug)]
pub struct LuaClosure {
    pub proto: Rc<Proto>,
    pub upvalues: Vec<Upvalue>,
}

/// A host-implemented function. Host upvalues carry no names.
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
    pub upvalues: Vec<Upvalue>,
    /// Introspection natives are transparent to stack level numbering
    pub introspective: bool,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("upvalues", &self.upvalues.len())
            .field("introspective", &self.introspective)
            .finish()
    }
}

#[derive(Debug)]
pub enum FunctionKind {
    Lua(LuaClosure),
    Native(NativeFunction),
}

/// A callable value. Metatable and environment are owned per instance.
pub struct Function {
    pub kind: FunctionKind,
    env: RefCell<Option<TableRef>>,
    metatable: RefCell<Option<TableRef>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("kind", &self.kind)
            .field("env", &table_ptr(&self.env.borrow()))
            .field("metatable", &table_ptr(&self.metatable.borrow()))
            .finish()
    }
}

impl Function {
    fn with_kind(kind: FunctionKind) -> FunctionRef {
        Rc::new(Function {
            kind,
            env: RefCell::new(None),
            metatable: RefCell::new(None),
        })
    }

    pub fn lua(proto: Rc<Proto>, upvalues: Vec<Upvalue>) -> FunctionRef {
        Self::with_kind(FunctionKind::Lua(LuaClosure { proto, upvalues }))
    }

    pub fn native(name: impl Into<String>, func: NativeFn) -> FunctionRef {
        Self::native_with_upvalues(name, func, Vec::new())
    }

    pub fn native_with_upvalues(
        name: impl Into<String>,
        func: NativeFn,
        upvalues: Vec<Upvalue>,
    ) -> FunctionRef {
        Self::with_kind(FunctionKind::Native(NativeFunction {
            name: name.into(),
            func,
            upvalues,
            introspective: false,
        }))
    }

    /// A native that inspects the stack it runs on; its own frame is never counted as a level.
    pub fn introspection(name: impl Into<String>, func: NativeFn) -> FunctionRef {
        Self::with_kind(FunctionKind::Native(NativeFunction {
            name: name.into(),
            func,
            upvalues: Vec::new(),
            introspective: true,
        }))
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, FunctionKind::Native(_))
    }

    pub fn is_introspective(&self) -> bool {
        matches!(&self.kind, FunctionKind::Native(n) if n.introspective)
    }

    pub fn proto(&self) -> Option<&Rc<Proto>> {
        match &self.kind {
            FunctionKind::Lua(closure) => Some(&closure.proto),
            FunctionKind::Native(_) => None,
        }
    }

    pub fn native_name(&self) -> Option<&str> {
        match &self.kind {
            FunctionKind::Native(native) => Some(&native.name),
            FunctionKind::Lua(_) => None,
        }
    }

    pub fn upvalues(&self) -> &[Upvalue] {
        match &self.kind {
            FunctionKind::Lua(closure) => &closure.upvalues,
            FunctionKind::Native(native) => &native.upvalues,
        }
    }

    /// Debug name of the upvalue at a 0-based position
    pub fn upvalue_name(&self, index: usize) -> Option<&str> {
        match &self.kind {
            FunctionKind::Lua(closure) => closure
                .proto
                .upvalue_names
                .get(index)
                .and_then(|name| name.as_deref()),
            FunctionKind::Native(_) => None,
        }
    }

    /// Explicitly assigned environment, `None` when inheriting the context globals
    pub fn environment(&self) -> Option<TableRef> {
        self.env.borrow().clone()
    }

    pub fn set_environment(&self, env: TableRef) {
        *self.env.borrow_mut() = Some(env);
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, metatable: Option<TableRef>) {
        *self.metatable.borrow_mut() = metatable;
    }
}

/// A host-defined object exposed to scripts.
#[derive(Default)]
pub struct Userdata {
    pub type_name: String,
    pub metatable: Option<TableRef>,
    pub env: Option<TableRef>,
}

impl fmt::Debug for Userdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Userdata")
            .field("type_name", &self.type_name)
            .field("metatable", &table_ptr(&self.metatable))
            .field("env", &table_ptr(&self.env))
            .finish()
    }
}

impl Userdata {
    pub fn new_ref(type_name: impl Into<String>) -> UserdataRef {
        Rc::new(RefCell::new(Userdata {
            type_name: type_name.into(),
            ..Userdata::default()
        }))
    }
}

/// Handle to an execution context (coroutine). Its environment is the
/// globals table used by code running on that thread.
pub struct ThreadHandle {
    pub name: String,
    pub env: TableRef,
    pub metatable: Option<TableRef>,
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("name", &self.name)
            .field("env", &Rc::as_ptr(&self.env))
            .field("metatable", &table_ptr(&self.metatable))
            .finish()
    }
}

impl ThreadHandle {
    pub fn new_ref(name: impl Into<String>, env: TableRef) -> ThreadRef {
        Rc::new(RefCell::new(ThreadHandle {
            name: name.into(),
            env,
            metatable: None,
        }))
    }
}
