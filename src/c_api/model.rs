use super::{c_slice, c_to_string, size_t_to_usize};
use crate::{
    error_model::{DecodeOutcome, ErrorModel, ErrorModelConfig},
    harq::HarqMethod,
    mcs::{McsTable, MAX_CQI},
};
use libc::size_t;
use std::{
    error::Error,
    ffi::{c_char, c_void},
};

type History = Vec<DecodeOutcome>;

fn build_model(mcs_table: &str, harq_method: &str) -> Result<ErrorModel, Box<dyn Error>> {
    let mcs_table: McsTable = mcs_table.parse()?;
    let harq_method: HarqMethod = harq_method.parse()?;
    Ok(ErrorModel::new(ErrorModelConfig {
        mcs_table,
        harq_method,
    }))
}

// Returns a negative value instead of panicking on invalid arguments.
fn decode(
    model: &ErrorModel,
    sinr: &[f64],
    map: &[usize],
    size_bits: u32,
    mcs: u8,
    history: &[DecodeOutcome],
) -> Option<DecodeOutcome> {
    if mcs > model.max_mcs()
        || map.is_empty()
        || size_bits == 0
        || map.iter().any(|&rb| rb >= sinr.len())
        || history.iter().any(|h| h.map.is_empty())
    {
        return None;
    }
    Some(model.tb_decodification_stats(sinr, map, size_bits, mcs, history))
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_error_model_ctor(
    mcs_table: *const c_char,
    harq_method: *const c_char,
) -> *mut c_void {
    let mcs_table = c_to_string(mcs_table);
    let harq_method = c_to_string(harq_method);
    if let Ok(model) = build_model(&mcs_table, &harq_method) {
        Box::into_raw(Box::new(model)) as *mut c_void
    } else {
        std::ptr::null_mut()
    }
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_error_model_dtor(model: *mut c_void) {
    drop(Box::from_raw(model as *mut ErrorModel));
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_history_ctor() -> *mut c_void {
    Box::into_raw(Box::new(History::new())) as *mut c_void
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_history_dtor(history: *mut c_void) {
    drop(Box::from_raw(history as *mut History));
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_history_clear(history: *mut c_void) {
    let history = &mut *(history as *mut History);
    history.clear();
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_history_len(history: *const c_void) -> size_t {
    let history = &*(history as *const History);
    history.len() as size_t
}

/// Returns the TBLER, or -1 if the arguments are invalid. The history can be
/// NULL for a first transmission. If `append` is set and the history is not
/// NULL, the outcome is appended to the history.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn nr_l2sm_tb_decodification_stats(
    model: *const c_void,
    sinr: *const f64,
    sinr_len: size_t,
    map: *const size_t,
    map_len: size_t,
    size_bits: u32,
    mcs: u8,
    history: *mut c_void,
    append: bool,
) -> f64 {
    let model = &*(model as *const ErrorModel);
    let sinr = c_slice(sinr, sinr_len);
    let map = c_slice(map, map_len)
        .iter()
        .map(|&rb| size_t_to_usize(rb))
        .collect::<Vec<usize>>();
    let history = if history.is_null() {
        None
    } else {
        Some(&mut *(history as *mut History))
    };
    let past = history.as_deref().map(|h| &h[..]).unwrap_or(&[]);
    let Some(outcome) = decode(model, sinr, &map, size_bits, mcs, past) else {
        return -1.0;
    };
    let tbler = outcome.tbler;
    if let (true, Some(history)) = (append, history) {
        history.push(outcome);
    }
    tbler
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_spectral_efficiency_for_mcs(model: *const c_void, mcs: u8) -> f64 {
    let model = &*(model as *const ErrorModel);
    if mcs > model.max_mcs() {
        return -1.0;
    }
    model.spectral_efficiency_for_mcs(mcs)
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_spectral_efficiency_for_cqi(model: *const c_void, cqi: u8) -> f64 {
    let model = &*(model as *const ErrorModel);
    if cqi > MAX_CQI {
        return -1.0;
    }
    model.spectral_efficiency_for_cqi(cqi)
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_payload_size(
    model: *const c_void,
    useful_sc: u32,
    mcs: u8,
    rb_num: u32,
) -> i64 {
    let model = &*(model as *const ErrorModel);
    if mcs > model.max_mcs() {
        return -1;
    }
    i64::from(model.payload_size(useful_sc, mcs, rb_num))
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_max_cb_size(model: *const c_void, tb_size: u32, mcs: u8) -> i64 {
    let model = &*(model as *const ErrorModel);
    if mcs > model.max_mcs() {
        return -1;
    }
    i64::from(model.max_cb_size(tb_size, mcs))
}

#[no_mangle]
unsafe extern "C" fn nr_l2sm_max_mcs(model: *const c_void) -> u8 {
    let model = &*(model as *const ErrorModel);
    model.max_mcs()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::ffi::CString;

    unsafe fn model(table: &str, method: &str) -> *mut c_void {
        let table = CString::new(table).unwrap();
        let method = CString::new(method).unwrap();
        nr_l2sm_error_model_ctor(table.as_ptr(), method.as_ptr())
    }

    #[test]
    fn invalid_names() {
        unsafe {
            assert!(model("Table3", "IncrementalRedundancy").is_null());
            assert!(model("Table1", "Foo").is_null());
        }
    }

    #[test]
    fn decodification_with_history() {
        unsafe {
            let model = model("Table1", "HarqIr");
            assert!(!model.is_null());
            assert_eq!(nr_l2sm_max_mcs(model), 28);
            let history = nr_l2sm_history_ctor();
            let sinr = [5.0; 4];
            let map: [size_t; 4] = [0, 1, 2, 3];
            let first = nr_l2sm_tb_decodification_stats(
                model,
                sinr.as_ptr(),
                4,
                map.as_ptr(),
                4,
                4000,
                14,
                history,
                true,
            );
            assert!((0.0..=1.0).contains(&first));
            assert_eq!(nr_l2sm_history_len(history), 1);
            let second = nr_l2sm_tb_decodification_stats(
                model,
                sinr.as_ptr(),
                4,
                map.as_ptr(),
                4,
                4000,
                14,
                history,
                false,
            );
            assert!(second <= first);
            assert_eq!(nr_l2sm_history_len(history), 1);
            // no history
            let again = nr_l2sm_tb_decodification_stats(
                model,
                sinr.as_ptr(),
                4,
                map.as_ptr(),
                4,
                4000,
                14,
                std::ptr::null_mut(),
                true,
            );
            assert_eq!(again, first);
            nr_l2sm_history_clear(history);
            assert_eq!(nr_l2sm_history_len(history), 0);
            nr_l2sm_history_dtor(history);
            nr_l2sm_error_model_dtor(model);
        }
    }

    #[test]
    fn invalid_arguments() {
        unsafe {
            let model = model("Table2", "ChaseCombining");
            let sinr = [5.0; 2];
            let map: [size_t; 2] = [0, 2];
            let call = |map: &[size_t], mcs| {
                nr_l2sm_tb_decodification_stats(
                    model,
                    sinr.as_ptr(),
                    sinr.len(),
                    map.as_ptr(),
                    map.len(),
                    1000,
                    mcs,
                    std::ptr::null_mut(),
                    false,
                )
            };
            // RB out of range
            assert_eq!(call(&map, 5), -1.0);
            // empty map
            assert_eq!(call(&[], 5), -1.0);
            // MCS out of range
            assert_eq!(call(&map[..1], 28), -1.0);
            assert!(call(&map[..1], 27) >= 0.0);
            assert_eq!(nr_l2sm_spectral_efficiency_for_mcs(model, 28), -1.0);
            assert_eq!(nr_l2sm_spectral_efficiency_for_cqi(model, 16), -1.0);
            assert_eq!(nr_l2sm_payload_size(model, 9, 28, 1), -1);
            assert_eq!(nr_l2sm_max_cb_size(model, 100, 28), -1);
            nr_l2sm_error_model_dtor(model);
        }
    }

    #[test]
    fn sizes() {
        unsafe {
            let model = model("Table1", "IncrementalRedundancy");
            assert_eq!(nr_l2sm_spectral_efficiency_for_mcs(model, 28), 5.5547);
            assert_eq!(nr_l2sm_spectral_efficiency_for_cqi(model, 15), 5.55);
            assert_eq!(nr_l2sm_payload_size(model, 9, 28, 10), 62);
            assert_eq!(nr_l2sm_max_cb_size(model, 1000, 20), 1056);
            nr_l2sm_error_model_dtor(model);
        }
    }
}
