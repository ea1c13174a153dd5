//! Benchmarks for signature comparison and memoized resolution.
//!
//! - Structural comparison of nested generic signatures
//! - Overload lookup among many declared methods
//! - First and repeated resolution of a member through a session

extern crate codesurgeon;

use codesurgeon::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};
use std::{hint::black_box, sync::Arc};

fn list_of(arg: TypeSignature) -> TypeSignature {
    TypeSignature::GenericInst {
        generic: Box::new(TypeSignature::class(TypeRef::external(
            "System.Collections",
            "System.Collections.Generic",
            "List`1",
        ))),
        args: vec![arg],
    }
}

/// Signature: List<List<...<int[]>...>> nested eight deep
fn nested_signature() -> TypeSignature {
    (0..8).fold(TypeSignature::from(Primitive::I4).sz_array(), |inner, _| {
        list_of(inner)
    })
}

fn target(methods: usize) -> ModuleDefRc {
    let module = ModuleDef::new("Target");
    let ty = module.add_type(TypeDef::new("N", "C", TypeAttributes::PUBLIC));
    for index in 0..methods {
        ty.add_method(MethodDef::new(
            format!("M{index}"),
            MethodAttributes::PUBLIC | MethodAttributes::STATIC,
            MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::I4.into()]),
        ));
    }
    module
}

/// Benchmark comparing two equal nested generic signatures.
fn bench_signature_compare_nested(c: &mut Criterion) {
    let left = nested_signature();
    let right = nested_signature();

    c.bench_function("sig_compare_nested_generic", |b| {
        b.iter(|| black_box(SigComparer::STRICT.types_equal(black_box(&left), black_box(&right))));
    });
}

/// Benchmark overload comparison, which ignores return types and scopes.
fn bench_signature_compare_overload(c: &mut Criterion) {
    let left = MethodSignature::new_static(nested_signature(), vec![nested_signature()]);
    let right = MethodSignature::new_static(Primitive::Void.into(), vec![nested_signature()]);
    let comparer = SigComparer::overload();

    c.bench_function("sig_compare_overload", |b| {
        b.iter(|| black_box(comparer.method_sigs_equal(black_box(&left), black_box(&right))));
    });
}

/// Benchmark locating a method among 256 siblings in a fresh session.
fn bench_resolve_method_cold(c: &mut Criterion) {
    let source = Arc::new(MemoryModuleSource::new());
    source.insert(target(256));
    let signature =
        MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::I4.into()]);

    c.bench_function("resolve_method_cold", |b| {
        b.iter(|| {
            let session = ResolutionSession::new(source.clone());
            let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
            let ty = module
                .declare_type("N", "C", ModificationKind::FailIfMissing, true)
                .unwrap();
            let method = ty
                .method("M255", signature.clone(), ModificationKind::FailIfMissing)
                .unwrap();
            black_box(session.resolve_method(&method).unwrap())
        });
    });
}

/// Benchmark answering a repeated resolution from the memo table.
fn bench_resolve_method_memoized(c: &mut Criterion) {
    let source = Arc::new(MemoryModuleSource::new());
    source.insert(target(256));
    let session = ResolutionSession::new(source);
    let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
    let ty = module
        .declare_type("N", "C", ModificationKind::FailIfMissing, true)
        .unwrap();
    let method = ty
        .method(
            "M255",
            MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::I4.into()]),
            ModificationKind::FailIfMissing,
        )
        .unwrap();
    session.resolve_method(&method).unwrap();

    c.bench_function("resolve_method_memoized", |b| {
        b.iter(|| black_box(session.resolve_method(black_box(&method)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_signature_compare_nested,
    bench_signature_compare_overload,
    bench_resolve_method_cold,
    bench_resolve_method_memoized,
);
criterion_main!(benches);
