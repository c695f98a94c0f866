use phf::{phf_map, phf_set};

use crate::analyzer::BuiltInType;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Builtin {
    pub params: &'static [BuiltInType],
    pub return_type: BuiltInType,
}

pub static BUILTINS: phf::Map<&'static str, Builtin> = phf_map! {
    "print" => Builtin { params: &[BuiltInType::String], return_type: BuiltInType::Void },
    "printi" => Builtin { params: &[BuiltInType::Int], return_type: BuiltInType::Void },
};

/// Symbols the preamble defines besides the builtins. User functions may not take these names.
pub static RESERVED: phf::Set<&'static str> = phf_set! {
    "printf",
    "scanf",
    "exit",
    "__runtime_error",
};

pub const RUNTIME_ERROR: &str = "@__runtime_error";
pub const DIVISION_BY_ZERO: &str = "Error division by zero";
pub const OUT_OF_BOUNDS: &str = "Error out of bounds";

pub const PREAMBLE: &str = r#"declare i32 @scanf(ptr, ...)
declare i32 @printf(ptr, ...)
declare void @exit(i32)
@.int_specifier = constant [4 x i8] c"%d\0A\00"
@.str_specifier = constant [4 x i8] c"%s\0A\00"

define void @printi(i32) {
  %spec_ptr = getelementptr [4 x i8], ptr @.int_specifier, i32 0, i32 0
  call i32 (ptr, ...) @printf(ptr %spec_ptr, i32 %0)
  ret void
}

define void @print(ptr) {
  %spec_ptr = getelementptr [4 x i8], ptr @.str_specifier, i32 0, i32 0
  call i32 (ptr, ...) @printf(ptr %spec_ptr, ptr %0)
  ret void
}

define void @__runtime_error(ptr) {
  call void @print(ptr %0)
  call void @exit(i32 0)
  unreachable
}
"#;
