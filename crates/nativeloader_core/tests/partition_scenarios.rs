mod common;

use common::{partition_backend, partition_loader, OEM_LIB, PRODUCT_LIB, SYSTEM_LIB};
use nativeloader_core::{ConfigureOutcome, LibraryRequest, LoaderError, Namespace};
use std::path::PathBuf;
use std::sync::Arc;

const OEM_APP: &str = "/oem/app/OemApp/OemApp.apk";

fn configure_isolated(loader: &nativeloader_core::NativeLoader) {
    loader
        .configure("system", &[PathBuf::from(SYSTEM_LIB)], &[], false)
        .unwrap();
    loader
        .configure("oem", &[PathBuf::from(OEM_LIB)], &["product".to_string()], false)
        .unwrap();
    loader
        .configure("product", &[PathBuf::from(PRODUCT_LIB)], &[], false)
        .unwrap();
}

#[test]
fn oem_module_loads_its_own_libraries() {
    let loader = partition_loader(Arc::new(partition_backend()));
    configure_isolated(&loader);

    for name in ["foo.oem1", "bar.oem1", "foo.oem2", "bar.oem2"] {
        let loaded = loader
            .load(&LibraryRequest::new(name, OEM_APP))
            .unwrap_or_else(|err| panic!("{name} should load: {err}"));
        assert_eq!(loaded.namespace, "oem");
        assert!(loader.namespace("oem").unwrap().contains_path(&loaded.path));
    }
}

#[test]
fn oem_module_cannot_see_product_libraries_without_fallback() {
    let loader = partition_loader(Arc::new(partition_backend()));
    configure_isolated(&loader);

    let err = loader
        .load(&LibraryRequest::new("foo.product1", OEM_APP))
        .expect_err("product library must stay hidden");
    assert_eq!(
        err,
        LoaderError::NotFound {
            library: "foo.product1".to_string(),
            namespace: "oem".to_string(),
        }
    );
}

#[test]
fn fallback_link_exposes_product_libraries() {
    let loader = partition_loader(Arc::new(partition_backend()));
    configure_isolated(&loader);
    loader
        .configure("oem", &[PathBuf::from(OEM_LIB)], &["product".to_string()], true)
        .unwrap();

    for name in ["foo.product1", "bar.product1"] {
        let loaded = loader
            .load(&LibraryRequest::new(name, OEM_APP))
            .unwrap_or_else(|err| panic!("{name} should load through link: {err}"));
        assert_eq!(loaded.namespace, "product");
        assert!(loaded.path.starts_with(PRODUCT_LIB));
    }
    assert!(loader
        .load(&LibraryRequest::new("foo.oem1", OEM_APP))
        .is_ok());
}

#[test]
fn product_app_sees_oem_and_product_public_libraries() {
    let loader = partition_loader(Arc::new(partition_backend()));
    loader
        .configure("system", &[PathBuf::from(SYSTEM_LIB)], &[], false)
        .unwrap();
    loader
        .configure_namespace(
            Namespace::new("oem", [OEM_LIB], Vec::<String>::new(), false)
                .with_public_libraries(["foo.oem1", "bar.oem1", "foo.oem2", "bar.oem2"]),
        )
        .unwrap();
    loader
        .configure(
            "product",
            &[PathBuf::from(PRODUCT_LIB)],
            &["oem".to_string(), "system".to_string()],
            true,
        )
        .unwrap();

    let product_app = "/product/app/ProductApp/ProductApp.apk";
    for name in [
        "foo.oem1",
        "bar.oem1",
        "foo.oem2",
        "bar.oem2",
        "foo.product1",
        "bar.product1",
    ] {
        loader
            .load(&LibraryRequest::new(name, product_app))
            .unwrap_or_else(|err| panic!("{name} should load: {err}"));
    }
    assert_eq!(loader.loaded_libraries().len(), 6);
}

#[test]
fn link_hides_libraries_outside_public_list() {
    let backend = partition_backend().with_file("/oem/lib/libprivate.oem1.so");
    let loader = partition_loader(Arc::new(backend));
    loader
        .configure("system", &[PathBuf::from(SYSTEM_LIB)], &[], false)
        .unwrap();
    loader
        .configure_namespace(
            Namespace::new("oem", [OEM_LIB], Vec::<String>::new(), false)
                .with_public_libraries(["foo.oem1"]),
        )
        .unwrap();
    loader
        .configure(
            "product",
            &[PathBuf::from(PRODUCT_LIB)],
            &["oem".to_string()],
            true,
        )
        .unwrap();

    let err = loader
        .load(&LibraryRequest::new("private.oem1", "product"))
        .expect_err("private library is not exported");
    assert!(matches!(err, LoaderError::NotFound { .. }));

    let own = loader
        .load(&LibraryRequest::new("private.oem1", "oem"))
        .expect("owner always sees its own search path");
    assert_eq!(own.namespace, "oem");
}

#[test]
fn reconfigure_keeps_public_library_list() {
    let backend = partition_backend().with_file("/oem/lib/libprivate.oem1.so");
    let loader = partition_loader(Arc::new(backend));
    loader
        .configure("system", &[PathBuf::from(SYSTEM_LIB)], &[], false)
        .unwrap();
    loader
        .configure_namespace(
            Namespace::new("oem", [OEM_LIB], Vec::<String>::new(), false)
                .with_public_libraries(["foo.oem1"]),
        )
        .unwrap();
    loader
        .configure(
            "product",
            &[PathBuf::from(PRODUCT_LIB)],
            &["oem".to_string()],
            true,
        )
        .unwrap();

    let outcome = loader
        .configure("oem", &[PathBuf::from(OEM_LIB)], &[], false)
        .unwrap();
    assert_eq!(outcome, ConfigureOutcome::Unchanged);
    let oem = loader.namespace("oem").unwrap();
    assert!(oem.exposes("foo.oem1"));
    assert!(!oem.exposes("private.oem1"));

    loader
        .configure("oem", &[PathBuf::from(OEM_LIB)], &[], true)
        .unwrap();
    assert!(loader.namespace("oem").unwrap().public_libraries.is_some());

    let err = loader
        .load(&LibraryRequest::new("private.oem1", "product"))
        .expect_err("reconfigure must not widen visibility");
    assert!(matches!(err, LoaderError::NotFound { .. }));
    let shared = loader
        .load(&LibraryRequest::new("foo.oem1", "product"))
        .expect("public library still visible");
    assert_eq!(shared.namespace, "oem");
}

#[test]
fn links_are_not_transitive() {
    let loader = partition_loader(Arc::new(partition_backend()));
    loader
        .configure("system", &[PathBuf::from(SYSTEM_LIB)], &[], false)
        .unwrap();
    loader
        .configure("product", &[PathBuf::from(PRODUCT_LIB)], &["system".to_string()], true)
        .unwrap();
    loader
        .configure("oem", &[PathBuf::from(OEM_LIB)], &["product".to_string()], true)
        .unwrap();

    let err = loader
        .load(&LibraryRequest::new("c", OEM_APP))
        .expect_err("system is two hops away from oem");
    assert!(matches!(err, LoaderError::NotFound { .. }));
    assert!(loader.load(&LibraryRequest::new("c", "product")).is_ok());
}

#[test]
fn unmatched_origin_resolves_to_base_namespace() {
    let loader = partition_loader(Arc::new(partition_backend()));
    configure_isolated(&loader);

    let request = LibraryRequest::new("c", "/data/app/com.example/base.apk");
    assert_eq!(loader.resolve(&request).unwrap().id, "system");
    let loaded = loader.load(&request).expect("libc is in system");
    assert_eq!(loaded.path, PathBuf::from("/system/lib/libc.so"));
}

#[test]
fn broken_library_stops_the_search() {
    let backend = partition_backend()
        .with_broken_file("/oem/lib/libfoo.product1.so", "unresolved symbol: oem_init");
    let backend = Arc::new(backend);
    let loader = partition_loader(Arc::clone(&backend));
    configure_isolated(&loader);
    loader
        .configure("oem", &[PathBuf::from(OEM_LIB)], &["product".to_string()], true)
        .unwrap();

    let err = loader
        .load(&LibraryRequest::new("foo.product1", OEM_APP))
        .expect_err("broken shadowing file fails the load");
    assert_eq!(
        err,
        LoaderError::Load {
            path: PathBuf::from("/oem/lib/libfoo.product1.so"),
            reason: "unresolved symbol: oem_init".to_string(),
        }
    );
    assert_eq!(backend.calls_for("/product/lib/libfoo.product1.so"), 0);
}
