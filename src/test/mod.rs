//! Shared builders for unit tests.

use crate::{
    assembly::{opcodes, Instruction, Operand},
    metadata::{
        attributes::{MethodAttributes, TypeAttributes},
        method::{MethodBody, MethodDef},
        module::{ModuleDef, ModuleDefRc},
        signatures::{MethodSignature, Primitive},
        typesystem::{MethodRef, TypeDef, TypeRef},
    },
};

/// `void System.Console::WriteLine(string)`
pub fn write_line() -> MethodRef {
    MethodRef::external(
        TypeRef::external("System.Console", "System", "Console"),
        "WriteLine",
        MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::String.into()]),
    )
}

/// `ldstr text; call Console.WriteLine; ret`
pub fn print_body(text: &str) -> MethodBody {
    MethodBody::new(
        1,
        vec![
            Instruction::new(&opcodes::LDSTR, Operand::String(text.to_string())),
            Instruction::new(&opcodes::CALL, Operand::Method(write_line())),
            Instruction::simple(&opcodes::RET),
        ],
    )
}

/// Module `Target` with a public type `N.C` declaring `public static void Nop()`, which prints
/// "original".
pub fn sample_module() -> ModuleDefRc {
    let module = ModuleDef::new("Target");
    let ty = module.add_type(TypeDef::new("N", "C", TypeAttributes::PUBLIC));
    ty.add_method(
        MethodDef::new(
            "Nop",
            MethodAttributes::PUBLIC | MethodAttributes::STATIC,
            MethodSignature::new_static(Primitive::Void.into(), vec![]),
        )
        .with_body(print_body("original")),
    );
    module
}
