//! S5 from spec.md §8: `RootGuard` accepts paths inside an advertised root,
//! rejects traversal out of it, and denies everything when no roots were
//! advertised.

use std::path::Path;

use turbomcp::prelude::*;

#[test]
fn s5_root_guard_boundary_checks() {
    let roots = vec![Root { uri: "file:///home/alice/project".to_string(), name: None }];
    let guard = RootGuard::new(&roots);

    assert!(guard.within(Path::new("/home/alice/project/src/main.py")));
    assert!(!guard.within(Path::new("/home/alice/project/../../../etc/passwd")));
    assert!(!guard.within(Path::new("/etc/passwd")));

    let empty_guard = RootGuard::new(&[]);
    assert!(!empty_guard.within(Path::new("/home/alice/project/src")));
}
