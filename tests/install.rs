//! End-to-end installation through the public API.

use std::{
    io::{BufRead, BufReader, Read, Write},
    sync::Arc,
};

use codesurgeon::{metadata::method::MethodDefRc, modification::TypeModificationRc, prelude::*};

fn void_static() -> MethodSignature {
    MethodSignature::new_static(Primitive::Void.into(), vec![])
}

fn write_line() -> MethodRef {
    MethodRef::external(
        TypeRef::external("System.Console", "System", "Console"),
        "WriteLine",
        MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::String.into()]),
    )
}

fn print(text: &str) -> Vec<Instruction> {
    vec![
        Instruction::new(&opcodes::LDSTR, Operand::String(text.to_string())),
        Instruction::new(&opcodes::CALL, Operand::Method(write_line())),
    ]
}

fn target_module() -> ModuleDefRc {
    let module = ModuleDef::new("Target");
    let ty = module.add_type(TypeDef::new("N", "C", TypeAttributes::PUBLIC));
    let mut instructions = print("original");
    instructions.push(Instruction::simple(&opcodes::RET));
    ty.add_method(
        MethodDef::new(
            "Nop",
            MethodAttributes::PUBLIC | MethodAttributes::STATIC,
            void_static(),
        )
        .with_body(MethodBody::new(1, instructions)),
    );
    module.add_type(TypeDef::new("N", "Hidden", TypeAttributes::NOT_PUBLIC));
    module
}

fn memory_source() -> (Arc<MemoryModuleSource>, ModuleDefRc) {
    let target = target_module();
    let source = Arc::new(MemoryModuleSource::new());
    source.insert(target.clone());
    (source, target)
}

/// Runs a body made of `ldstr`, `call` and `ret`, collecting what `WriteLine` prints.
fn run(method: &MethodDefRc) -> Vec<String> {
    let mut output = Vec::new();
    let mut stack = Vec::new();
    let Some(body) = method.body() else {
        return output;
    };

    for instruction in &body.instructions {
        match (instruction.mnemonic, &instruction.operand) {
            ("ldstr", Operand::String(text)) => stack.push(text.clone()),
            ("call", Operand::Method(callee)) => match callee.definition() {
                Some(def) => output.extend(run(&def)),
                None if callee.full_name().contains("WriteLine") => {
                    output.push(stack.pop().expect("WriteLine needs an argument"));
                }
                None => panic!("cannot call {}", callee.full_name()),
            },
            ("ret", _) => break,
            (mnemonic, operand) => panic!("unsupported {mnemonic} {operand:?}"),
        }
    }
    output
}

fn writable_type(patch: &StandardPatch, name: &str, kind: ModificationKind) -> TypeModificationRc {
    patch
        .module("Target", ModificationKind::FailIfMissing, false)
        .unwrap()
        .declare_type("N", name, kind, false)
        .unwrap()
}

fn install(source: Arc<MemoryModuleSource>, patch: StandardPatch) -> Result<InstallReport> {
    let mut installer = PatchInstaller::new(source);
    installer.add(patch);
    installer.install()
}

#[test]
fn mixin_keeps_the_original_body_reachable() {
    let (source, target) = memory_source();

    let module = ModuleDef::new("Greeting");
    let patch_type = module.add_type(TypeDef::new("P", "CPatch", TypeAttributes::PUBLIC));
    let base = patch_type.add_method(MethodDef::new(
        "Base",
        MethodAttributes::PRIVATE | MethodAttributes::STATIC,
        void_static(),
    ));
    let mut instructions = vec![Instruction::new(
        &opcodes::CALL,
        Operand::Method(MethodRef::from_def(&base)),
    )];
    instructions.extend(print("patched"));
    instructions.push(Instruction::simple(&opcodes::RET));
    let nop = patch_type.add_method(
        MethodDef::new(
            "Nop",
            MethodAttributes::PUBLIC | MethodAttributes::STATIC,
            void_static(),
        )
        .with_body(MethodBody::new(1, instructions)),
    );

    let manifest = PatchManifest::new()
        .named("Greeting")
        .require("Target", false)
        .declare(
            patch_type.token(),
            Declaration::new(Intent::Mixin)
                .named("N.C")
                .from_module("Target"),
        )
        .declare(nop.token(), Declaration::new(Intent::Mixin))
        .base_dependency(base.token());
    let patch = PatchImporter::import(&module, &manifest).unwrap();

    let report = install(source.clone(), patch).unwrap();
    assert_eq!(report.patches, vec!["Greeting"]);
    assert_eq!(report.saved_modules, vec!["Target"]);
    assert_eq!(report.hidden_methods.len(), 1);
    assert!(report.hidden_methods[0].ends_with("Nop<Base>$0()"));
    assert_eq!(source.save_count("Target"), 1);

    let ty = target.find_type("N", "C").unwrap();
    let names: Vec<String> = ty.methods.iter().map(|m| m.name.clone()).collect();
    assert_eq!(names, vec!["Nop", "Nop<Base>$0"]);
    assert!(ty.find_methods("Base").is_empty());

    let patched = &ty.find_methods("Nop")[0];
    assert_eq!(run(patched), vec!["original", "patched"]);
    assert_eq!(run(&ty.find_methods("Nop<Base>$0")[0]), vec!["original"]);
}

#[test]
fn resolution_is_memoized() {
    let (source, target) = memory_source();
    let session = ResolutionSession::new(source);

    let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
    let ty = module
        .declare_type("N", "C", ModificationKind::FailIfMissing, true)
        .unwrap();
    let nop = ty
        .method("Nop", void_static(), ModificationKind::FailIfMissing)
        .unwrap();

    let first = session.resolve_method(&nop).unwrap();
    let second = session.resolve_method(&nop).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(
        &session.resolve_type(&ty).unwrap(),
        &target.find_type("N", "C").unwrap()
    ));
    assert_eq!(session.resolved_count(), 3);
    assert!(session.memo_hits() >= 1);
}

#[test]
fn existence_policies() {
    let (source, target) = memory_source();

    let present = StandardPatch::new("Present");
    writable_type(&present, "C", ModificationKind::FailIfPresent);
    let err = install(source.clone(), present).unwrap_err();
    assert!(matches!(err.root(), Error::AlreadyExists { .. }));
    assert_eq!(err.symbol(), Some((SymbolKind::Type, "N.C")));

    let missing = StandardPatch::new("Missing");
    writable_type(&missing, "Nowhere", ModificationKind::FailIfMissing);
    let err = install(source.clone(), missing).unwrap_err();
    assert!(matches!(err.root(), Error::NotFound { .. }));

    let created = StandardPatch::new("Created");
    writable_type(&created, "C", ModificationKind::CreateIfMissing)
        .set_attributes(TypeAttributes::PUBLIC);
    writable_type(&created, "Fresh", ModificationKind::CreateIfMissing)
        .set_attributes(TypeAttributes::PUBLIC);
    install(source.clone(), created).unwrap();

    let names: Vec<String> = target.all_types().iter().map(|t| t.full_name()).collect();
    assert_eq!(names.iter().filter(|name| *name == "N.C").count(), 1);
    assert!(target.find_type("N", "Fresh").is_some());
    assert_eq!(source.total_saves(), 1);
}

#[test]
fn read_only_modules_accept_unchanged_dependencies_only() {
    let (source, target) = memory_source();

    let check = StandardPatch::new("Check");
    let module = check
        .module("Target", ModificationKind::FailIfMissing, true)
        .unwrap();
    let ty = module
        .declare_type("N", "C", ModificationKind::FailIfMissing, true)
        .unwrap();
    ty.method("Nop", void_static(), ModificationKind::FailIfMissing)
        .unwrap()
        .set_attributes(MethodAttributes::PUBLIC | MethodAttributes::STATIC);
    let report = install(source.clone(), check).unwrap();
    assert!(report.saved_modules.is_empty());

    let inject = StandardPatch::new("Inject");
    inject
        .module("Target", ModificationKind::FailIfMissing, true)
        .unwrap()
        .declare_type("N", "C", ModificationKind::FailIfMissing, true)
        .unwrap()
        .field(
            "added",
            FieldSignature::new(Primitive::I4.into()),
            ModificationKind::FailIfPresent,
        )
        .unwrap();
    let err = install(source.clone(), inject).unwrap_err();
    assert!(matches!(&err, Error::Patch { patch, .. } if patch == "Inject"));
    assert!(matches!(err.root(), Error::ReadOnlyViolation { .. }));
    assert!(target.find_type("N", "C").unwrap().find_field("added").is_none());
    assert_eq!(source.total_saves(), 0);
}

#[test]
fn accessibility_follows_the_existence_policy() {
    let (source, target) = memory_source();

    let widen = StandardPatch::new("Widen");
    writable_type(&widen, "Hidden", ModificationKind::CreateIfMissing)
        .set_attributes(TypeAttributes::PUBLIC);
    install(source.clone(), widen).unwrap();
    assert_eq!(
        target.find_type("N", "Hidden").unwrap().attributes(),
        TypeAttributes::PUBLIC
    );

    let keep = StandardPatch::new("Keep");
    let ty = writable_type(&keep, "C", ModificationKind::FailIfMissing);
    ty.method("Nop", void_static(), ModificationKind::FailIfMissing)
        .unwrap()
        .set_attributes(MethodAttributes::PRIVATE | MethodAttributes::STATIC);
    install(source.clone(), keep).unwrap();
    let nop = &target.find_type("N", "C").unwrap().find_methods("Nop")[0];
    assert_eq!(
        nop.attributes() & MethodAttributes::MEMBER_ACCESS_MASK,
        MethodAttributes::PUBLIC
    );

    let narrow_read_only = StandardPatch::new("NarrowReadOnly");
    narrow_read_only
        .module("Target", ModificationKind::FailIfMissing, true)
        .unwrap()
        .declare_type("N", "C", ModificationKind::CreateIfMissing, true)
        .unwrap()
        .set_attributes(TypeAttributes::NOT_PUBLIC);
    let err = install(source.clone(), narrow_read_only).unwrap_err();
    assert!(matches!(err.root(), Error::ReadOnlyViolation { .. }));
    assert_eq!(
        target.find_type("N", "C").unwrap().attributes(),
        TypeAttributes::PUBLIC
    );

    let narrow = StandardPatch::new("Narrow");
    writable_type(&narrow, "C", ModificationKind::CreateIfMissing)
        .set_attributes(TypeAttributes::NOT_PUBLIC);
    install(source, narrow).unwrap();
    assert_eq!(
        target.find_type("N", "C").unwrap().attributes(),
        TypeAttributes::NOT_PUBLIC
    );
}

#[test]
fn signatures_compare_by_shape() {
    let int = TypeSignature::from(Primitive::I4);
    let console = TypeRef::external("System.Console", "System", "Console");
    let other_scope = TypeRef::external("System.Runtime", "System", "Console");

    assert!(SigComparer::STRICT.types_equal(&int.clone().sz_array(), &int.clone().sz_array()));
    assert!(!SigComparer::STRICT.types_equal(&int.clone().sz_array(), &int.clone().ptr()));
    assert!(!SigComparer::STRICT.types_equal(
        &TypeSignature::class(console.clone()),
        &TypeSignature::value_type(console.clone())
    ));
    assert!(!SigComparer::STRICT.type_refs_equal(&console, &other_scope));
    assert!(SigComparer::overload().type_refs_equal(&console, &other_scope));

    let returns_int = MethodSignature::new_static(int.clone(), vec![]);
    assert!(!SigComparer::STRICT.method_sigs_equal(&returns_int, &void_static()));
    assert!(SigComparer::overload().method_sigs_equal(&returns_int, &void_static()));
    assert!(!SigComparer::overload().method_sigs_equal(
        &void_static(),
        &MethodSignature::new_instance(Primitive::Void.into(), vec![])
    ));
}

/// One `namespace name` line per top-level type.
struct TypeListCodec;

impl ModuleCodec for TypeListCodec {
    fn decode(&self, name: &str, reader: &mut dyn Read) -> Result<ModuleDefRc> {
        let module = ModuleDef::new(name);
        for line in BufReader::new(reader).lines() {
            let line = line?;
            if let Some((namespace, name)) = line.split_once(' ') {
                module.add_type(TypeDef::new(namespace, name, TypeAttributes::PUBLIC));
            }
        }
        Ok(module)
    }

    fn encode(&self, module: &ModuleDef, writer: &mut dyn Write) -> Result<()> {
        for ty in module.all_types() {
            writeln!(writer, "{} {}", ty.namespace, ty.name)?;
        }
        Ok(())
    }
}

fn created_type_patch() -> StandardPatch {
    let patch = StandardPatch::new("Create");
    writable_type(&patch, "Added", ModificationKind::FailIfPresent)
        .set_attributes(TypeAttributes::PUBLIC);
    writable_type(&patch, "C", ModificationKind::FailIfMissing)
        .set_attributes(TypeAttributes::PUBLIC);
    patch
}

#[test]
fn file_streams_round_trip_through_a_codec() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Target.dll"), "N C\n").unwrap();

    let files: Arc<dyn StreamSource> = Arc::new(FileStreamSource::new(dir.path()));
    let source = Arc::new(StreamModuleSource::new(files, TypeListCodec));
    let mut installer = PatchInstaller::new(source);
    installer.add(created_type_patch());
    let report = installer.install().unwrap();

    assert_eq!(report.saved_modules, vec!["Target"]);
    let written = std::fs::read_to_string(dir.path().join("Target.dll")).unwrap();
    assert_eq!(written, "N C\nN Added\n");
}

#[test]
fn read_only_roots_redirect_or_refuse_writes() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("Target.dll"), "N C\n").unwrap();

    let roots: Vec<Arc<dyn StreamSource>> = vec![Arc::new(FileStreamSource::new(input.path()))];

    let refusing: Arc<dyn StreamSource> = Arc::new(ReadOnlyStreamSource::new(roots.clone()));
    let mut installer = PatchInstaller::new(Arc::new(StreamModuleSource::new(
        refusing,
        TypeListCodec,
    )));
    installer.add(created_type_patch());
    let err = installer.install().unwrap_err();
    assert!(matches!(err, Error::ReadOnlyViolation { .. }));

    let redirected: Arc<dyn StreamSource> = Arc::new(WritableStreamSource::new(
        roots,
        Arc::new(FileStreamSource::new(output.path())),
    ));
    let mut installer = PatchInstaller::new(Arc::new(StreamModuleSource::new(
        redirected,
        TypeListCodec,
    )));
    installer.add(created_type_patch());
    installer.install().unwrap();

    assert_eq!(
        std::fs::read_to_string(input.path().join("Target.dll")).unwrap(),
        "N C\n"
    );
    assert_eq!(
        std::fs::read_to_string(output.path().join("Target.dll")).unwrap(),
        "N C\nN Added\n"
    );
}
