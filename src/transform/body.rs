use std::sync::Arc;

use crate::{
    assembly::{Instruction, Operand},
    metadata::{
        method::{MethodBody, MethodDefRc},
        signatures::LocalVariable,
    },
    modification::{MethodModificationRc, Modification},
    resolver::SearchContext,
    transform::{TokenTransformer, TransformContext},
    Result,
};

fn import_operand(
    operand: &Operand,
    transformer: &dyn TokenTransformer,
    cx: &TransformContext<'_>,
) -> Result<Operand> {
    Ok(match operand {
        Operand::Type(type_ref) => Operand::Type(transformer.transform_type(type_ref, cx)?),
        Operand::Field(field) => Operand::Field(transformer.transform_field(field, cx)?),
        Operand::Method(method) => Operand::Method(transformer.transform_method(method, cx)?),
        Operand::Token(token) => transformer.transform_token(*token, cx)?,
        Operand::Signature(signature) => {
            Operand::Signature(Arc::new(transformer.transform_call_site(signature, cx)?))
        }
        Operand::None
        | Operand::Immediate(_)
        | Operand::String(_)
        | Operand::Target(_)
        | Operand::Switch(_)
        | Operand::Local(_)
        | Operand::Argument(_) => operand.clone(),
    })
}

/// Rewrites every operand, local type and catch type of `body` through `transformer`.
///
/// Branch targets are instruction indices and carry over unchanged; offsets are recomputed for
/// the rewritten instructions.
///
/// # Errors
/// The first error raised by the transformer.
pub fn import_body(
    body: &MethodBody,
    transformer: &dyn TokenTransformer,
    cx: &TransformContext<'_>,
) -> Result<MethodBody> {
    let instructions = body
        .instructions
        .iter()
        .map(|instruction| {
            Ok(Instruction {
                operand: import_operand(&instruction.operand, transformer, cx)?,
                ..instruction.clone()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let locals = body
        .locals
        .iter()
        .map(|local| {
            Ok(LocalVariable::new(
                transformer.transform_signature(&local.signature, cx)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut exception_handlers = body.exception_handlers.clone();
    for handler in &mut exception_handlers {
        if let Some(catch_type) = &handler.catch_type {
            handler.catch_type = Some(transformer.transform_type(catch_type, cx)?);
        }
    }

    let mut imported = MethodBody {
        max_stack: body.max_stack,
        init_locals: body.init_locals,
        locals,
        instructions,
        exception_handlers,
    };
    imported.recompute_offsets();
    Ok(imported)
}

/// Replaces the body of the method `modification` resolves to with its transplant body.
///
/// Returns the hidden base method if the transplanted body called the original one.
///
/// # Errors
/// [`crate::Error::ReadOnlyViolation`] for read-only methods, any resolution error of the method
/// or of an operand.
pub fn transplant(
    search: &dyn SearchContext,
    modification: &MethodModificationRc,
    hidden_suffix: &str,
) -> Result<Option<MethodDefRc>> {
    let Some(transplant) = modification.body() else {
        return Ok(None);
    };

    modification.begin_modify()?;
    let method = search.resolve_method(modification)?;
    let cx = TransformContext::new(search, method.clone(), hidden_suffix);
    let body = import_body(&transplant.body, transplant.transformer.as_ref(), &cx)?;

    method.set_body(Some(Arc::new(body)));
    log::debug!("replaced body of {}", method.full_name());
    Ok(cx.into_hidden())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        io::MemoryModuleSource,
        metadata::{
            attributes::{MethodAttributes, TypeAttributes},
            method::{ExceptionHandler, MethodDef},
            module::ModuleDefRc,
            signatures::{MethodSignature, Primitive, TypeSignature},
            typesystem::{MethodRef, TypeDef, TypeRef},
        },
        modification::{ModificationKind, ModuleModification, TransplantBody},
        resolver::ResolutionSession,
        test::{print_body, sample_module, write_line},
        transform::DefaultTokenTransformer,
        Error,
    };

    const SUFFIX: &str = "<Base>$";

    fn void_static() -> MethodSignature {
        MethodSignature::new_static(Primitive::Void.into(), vec![])
    }

    fn session_over(module: ModuleDefRc) -> ResolutionSession {
        let source = Arc::new(MemoryModuleSource::new());
        source.insert(module);
        ResolutionSession::new(source)
    }

    fn calling_base(base: &MethodRef, times: usize, text: &str) -> MethodBody {
        let mut instructions: Vec<_> = (0..times)
            .map(|_| Instruction::new(&opcodes::CALL, Operand::Method(base.clone())))
            .collect();
        instructions.extend(print_body(text).instructions);
        MethodBody::new(1, instructions)
    }

    fn method_names(module: &ModuleDefRc) -> Vec<String> {
        module
            .find_type("N", "C")
            .unwrap()
            .methods
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    #[test]
    fn base_calls_share_one_hidden_method() {
        let session = session_over(sample_module());
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();
        let nop = ty
            .method("Nop", void_static(), ModificationKind::FailIfMissing)
            .unwrap();

        let base = MethodRef::tracked(&nop);
        let transformer = DefaultTokenTransformer::new().with_base_dependency(base.clone());
        nop.set_body(TransplantBody::new(
            Arc::new(calling_base(&base, 2, "patched")),
            Arc::new(transformer),
        ));

        let hidden = transplant(&session, &nop, SUFFIX).unwrap().unwrap();
        assert_eq!(hidden.name, "Nop<Base>$0");
        assert!(hidden.is_static());
        assert_eq!(
            hidden.attributes() & MethodAttributes::MEMBER_ACCESS_MASK,
            MethodAttributes::COMPILER_CONTROLLED
        );

        let target = session.module("Target").unwrap();
        assert_eq!(method_names(&target), vec!["Nop", "Nop<Base>$0"]);

        let method = session.resolve_method(&nop).unwrap();
        let body = method.body().unwrap();
        for instruction in &body.instructions[..2] {
            match &instruction.operand {
                Operand::Method(call) => {
                    assert!(Arc::ptr_eq(&call.definition().unwrap(), &hidden));
                }
                other => panic!("unexpected operand {other:?}"),
            }
        }
        assert!(matches!(&body.instructions[2].operand, Operand::String(s) if s == "patched"));
        assert_eq!(body.instructions[2].offset, 10);

        let original = hidden.body().unwrap();
        assert!(matches!(&original.instructions[0].operand, Operand::String(s) if s == "original"));
    }

    #[test]
    fn distinct_originals_get_distinct_hidden_methods() {
        let target = sample_module();
        let ty = target.find_type("N", "C").unwrap();
        ty.add_method(
            MethodDef::new(
                "Other",
                MethodAttributes::PUBLIC | MethodAttributes::STATIC,
                void_static(),
            )
            .with_body(print_body("other")),
        );
        ty.add_method(MethodDef::new(
            "Nop<Base>$0",
            MethodAttributes::PRIVATE | MethodAttributes::STATIC,
            void_static(),
        ));
        let session = session_over(target.clone());

        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let declared = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();

        let mut hidden = Vec::new();
        for name in ["Nop", "Other"] {
            let method = declared
                .method(name, void_static(), ModificationKind::FailIfMissing)
                .unwrap();
            let base = MethodRef::tracked(&method);
            method.set_body(TransplantBody::new(
                Arc::new(calling_base(&base, 1, "after")),
                Arc::new(DefaultTokenTransformer::new().with_base_dependency(base)),
            ));
            hidden.push(transplant(&session, &method, SUFFIX).unwrap().unwrap());
        }

        assert_eq!(hidden[0].name, "Nop<Base>$1");
        assert_eq!(hidden[1].name, "Other<Base>$0");
        assert_eq!(ty.methods.len(), 5);
    }

    #[test]
    fn locals_handlers_and_tokens_are_mapped() {
        let target = sample_module();
        let session = session_over(target.clone());
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();
        let helper = module
            .declare_type("N", "Helper", ModificationKind::CreateIfMissing, false)
            .unwrap();
        let nop = ty
            .method("Nop", void_static(), ModificationKind::FailIfMissing)
            .unwrap();

        let mut body = MethodBody::new(
            1,
            vec![
                Instruction::new(&opcodes::LDTOKEN, Operand::Token(target.find_type("N", "C").unwrap().token())),
                Instruction::simple(&opcodes::POP),
                Instruction::new(&opcodes::CALL, Operand::Method(write_line())),
                Instruction::simple(&opcodes::RET),
            ],
        );
        body.locals
            .push(LocalVariable::new(TypeSignature::class(TypeRef::tracked(&helper))));
        body.exception_handlers.push(ExceptionHandler::catch(
            0..2,
            2..3,
            TypeRef::tracked(&helper),
        ));

        nop.set_body(TransplantBody::new(
            Arc::new(body),
            Arc::new(DefaultTokenTransformer::new().with_token_scope(target.clone())),
        ));
        assert!(transplant(&session, &nop, SUFFIX).unwrap().is_none());

        let created = target.find_type("N", "Helper").unwrap();
        let method = target.find_type("N", "C").unwrap().find_methods("Nop").pop().unwrap();
        let body = method.body().unwrap();
        assert!(matches!(&body.instructions[0].operand, Operand::Type(TypeRef::Def(_))));
        match &body.locals[0].signature {
            TypeSignature::Class(class) => {
                assert!(Arc::ptr_eq(&class.definition().unwrap(), &created));
            }
            other => panic!("unexpected local {other}"),
        }
        let catch_type = body.exception_handlers[0].catch_type.as_ref().unwrap();
        assert!(Arc::ptr_eq(&catch_type.definition().unwrap(), &created));
        assert_eq!(created.attributes(), TypeAttributes::empty());
    }

    #[test]
    fn unknown_tokens_fail() {
        let session = session_over(sample_module());
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();
        let nop = ty
            .method("Nop", void_static(), ModificationKind::FailIfMissing)
            .unwrap();
        nop.set_body(TransplantBody::new(
            Arc::new(MethodBody::new(
                1,
                vec![
                    Instruction::new(
                        &opcodes::LDTOKEN,
                        Operand::Token(crate::metadata::token::Token::new(0x0200_0042)),
                    ),
                    Instruction::simple(&opcodes::RET),
                ],
            )),
            Arc::new(DefaultTokenTransformer::new()),
        ));

        assert!(matches!(
            transplant(&session, &nop, SUFFIX),
            Err(Error::UnresolvedToken(_))
        ));
    }

    #[test]
    fn read_only_methods_are_not_rewritten() {
        let session = session_over(sample_module());
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, true)
            .unwrap();
        let nop = ty
            .method("Nop", void_static(), ModificationKind::FailIfMissing)
            .unwrap();
        nop.set_body(TransplantBody::new(
            Arc::new(print_body("patched")),
            Arc::new(DefaultTokenTransformer::new()),
        ));

        assert!(matches!(
            transplant(&session, &nop, SUFFIX),
            Err(Error::ReadOnlyViolation { .. })
        ));
    }
}
