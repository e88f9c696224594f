use libc::size_t;
use std::{
    convert::TryFrom,
    ffi::{c_char, CStr},
};

mod model;

unsafe fn c_to_string(s: *const c_char) -> String {
    String::from_utf8_lossy(CStr::from_ptr(s).to_bytes()).to_string()
}

#[allow(clippy::useless_conversion)]
fn size_t_to_usize(n: size_t) -> usize {
    usize::try_from(n).unwrap()
}

// Null pointers are allowed for empty slices.
unsafe fn c_slice<'a, T>(ptr: *const T, len: size_t) -> &'a [T] {
    let len = size_t_to_usize(len);
    if len == 0 || ptr.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}
