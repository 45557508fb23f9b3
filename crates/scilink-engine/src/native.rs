//! Binding to a Scilab installation through `call_scilab` and `api_scilab`.
//!
//! The shared libraries are opened at runtime, so building this crate does
//! not require Scilab headers. Scilab keeps a single interpreter per process;
//! only one [`NativeEngine`] may exist at a time.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use libloading::Library;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::protocol::{Engine, SciErr, StartOptions, MESSAGE_STACK_SIZE};

/// Library holding the matrix API (`createNamedMatrixOfDouble`, ...).
pub const API_LIBRARY: &str = "scilab-cli";
/// Library holding the engine lifecycle (`StartScilab`, ...).
pub const CALL_LIBRARY: &str = "scicall_scilab";

/// Code reported when a name cannot be passed to C.
const INVALID_NAME: c_int = -1;

static CLAIMED: AtomicBool = AtomicBool::new(false);

/// `SciErr` as laid out by `api_scilab.h`.
#[repr(C)]
struct RawSciErr {
    i_err: c_int,
    i_msg_count: c_int,
    pst_msg: [*mut c_char; MESSAGE_STACK_SIZE],
}

impl RawSciErr {
    fn into_status(self) -> SciErr {
        let count = usize::try_from(self.i_msg_count)
            .unwrap_or(0)
            .min(MESSAGE_STACK_SIZE);
        let messages = self.pst_msg[..count]
            .iter()
            .filter(|msg| !msg.is_null())
            // SAFETY: non-null entries of the message stack are NUL-terminated strings
            // owned by Scilab for the duration of this call.
            .map(|msg| unsafe { CStr::from_ptr(*msg) }.to_string_lossy().into_owned())
            .collect();
        SciErr {
            code: self.i_err,
            messages,
        }
    }
}

type DisableInteractiveModeFn = unsafe extern "C" fn();
type StartScilabFn = unsafe extern "C" fn(*mut c_char, *mut c_char, c_int) -> c_int;
type TerminateScilabFn = unsafe extern "C" fn(*mut c_char) -> c_int;
type SendScilabJobFn = unsafe extern "C" fn(*mut c_char) -> c_int;
type CreateNamedMatrixOfDoubleFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, c_int, c_int, *const f64) -> RawSciErr;
type CreateNamedScalarDoubleFn = unsafe extern "C" fn(*mut c_void, *const c_char, f64) -> c_int;
type CreateNamedScalarInteger32Fn =
    unsafe extern "C" fn(*mut c_void, *const c_char, c_int) -> c_int;
type GetNamedVarDimensionFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut c_int, *mut c_int) -> RawSciErr;
type ReadNamedMatrixOfDoubleFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut c_int, *mut c_int, *mut f64) -> RawSciErr;
type GetNamedScalarDoubleFn = unsafe extern "C" fn(*mut c_void, *const c_char, *mut f64) -> c_int;
type GetNamedScalarInteger32Fn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut c_int) -> c_int;

/// Resolved entry points.
struct Api {
    disable_interactive_mode: DisableInteractiveModeFn,
    start_scilab: StartScilabFn,
    terminate_scilab: TerminateScilabFn,
    send_scilab_job: SendScilabJobFn,
    create_named_matrix_of_double: CreateNamedMatrixOfDoubleFn,
    create_named_scalar_double: CreateNamedScalarDoubleFn,
    create_named_scalar_integer32: CreateNamedScalarInteger32Fn,
    get_named_var_dimension: GetNamedVarDimensionFn,
    read_named_matrix_of_double: ReadNamedMatrixOfDoubleFn,
    get_named_scalar_double: GetNamedScalarDoubleFn,
    get_named_scalar_integer32: GetNamedScalarInteger32Fn,
}

/// Copy a function pointer out of a library.
///
/// # Safety
///
/// `T` must match the C signature of `symbol`.
unsafe fn symbol<T: Copy>(library: &Library, symbol: &[u8]) -> Result<T> {
    Ok(*library.get::<T>(symbol)?)
}

/// A Scilab interpreter living in this process.
pub struct NativeEngine {
    api: Api,
    // Dropped in declaration order: call_scilab before the API library it links against.
    _call: Library,
    _cli: Library,
}

impl NativeEngine {
    /// Open the Scilab libraries found in `library_dir`.
    pub fn load(library_dir: &Path) -> Result<Self> {
        if CLAIMED.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }
        Self::open(library_dir).inspect_err(|_| CLAIMED.store(false, Ordering::SeqCst))
    }

    fn open(library_dir: &Path) -> Result<Self> {
        let cli_path = library_dir.join(platform_lib_name(API_LIBRARY));
        let call_path = library_dir.join(platform_lib_name(CALL_LIBRARY));
        info!(library = %cli_path.display(), "loading Scilab libraries");

        // SAFETY: loading Scilab runs its library constructors, which have no
        // preconditions beyond being loaded once per process (guarded by CLAIMED).
        let cli = unsafe { Library::new(&cli_path)? };
        let call = unsafe { Library::new(&call_path)? };

        // SAFETY: each type alias mirrors the declaration in call_scilab.h / api_scilab.h.
        let api = unsafe {
            Api {
                disable_interactive_mode: symbol(&call, b"DisableInteractiveMode\0")?,
                start_scilab: symbol(&call, b"StartScilab\0")?,
                terminate_scilab: symbol(&call, b"TerminateScilab\0")?,
                send_scilab_job: symbol(&call, b"SendScilabJob\0")?,
                create_named_matrix_of_double: symbol(&cli, b"createNamedMatrixOfDouble\0")?,
                create_named_scalar_double: symbol(&cli, b"createNamedScalarDouble\0")?,
                create_named_scalar_integer32: symbol(&cli, b"createNamedScalarInteger32\0")?,
                get_named_var_dimension: symbol(&cli, b"getNamedVarDimension\0")?,
                read_named_matrix_of_double: symbol(&cli, b"readNamedMatrixOfDouble\0")?,
                get_named_scalar_double: symbol(&cli, b"getNamedScalarDouble\0")?,
                get_named_scalar_integer32: symbol(&cli, b"getNamedScalarInteger32\0")?,
            }
        };

        Ok(NativeEngine {
            api,
            _call: call,
            _cli: cli,
        })
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        CLAIMED.store(false, Ordering::SeqCst);
    }
}

/// Platform file name of a shared library.
fn platform_lib_name(name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("{name}.dll")
    }
    #[cfg(target_os = "macos")]
    {
        format!("lib{name}.dylib")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        format!("lib{name}.so")
    }
}

fn c_string(text: &str) -> Option<CString> {
    CString::new(text).ok()
}

fn invalid_name(name: &str) -> SciErr {
    SciErr::new(INVALID_NAME, format!("{name:?} contains a NUL byte"))
}

impl Engine for NativeEngine {
    fn start(&mut self, options: &StartOptions) -> bool {
        let Some(sci_path) = c_string(&options.sci_path.to_string_lossy()) else {
            return false;
        };
        let startup = match options.startup_script.as_deref().map(c_string) {
            Some(None) => return false,
            Some(Some(script)) => Some(script),
            None => None,
        };
        let startup_ptr = startup
            .as_ref()
            .map_or(ptr::null_mut(), |s| s.as_ptr() as *mut c_char);

        // SAFETY: both strings outlive the call; Scilab does not write through them.
        unsafe {
            (self.api.disable_interactive_mode)();
            (self.api.start_scilab)(
                sci_path.as_ptr() as *mut c_char,
                startup_ptr,
                options.stack_size,
            ) != 0
        }
    }

    fn terminate(&mut self, quit_script: Option<&str>) -> bool {
        let quit = match quit_script.map(c_string) {
            Some(None) => return false,
            Some(Some(script)) => Some(script),
            None => None,
        };
        let quit_ptr = quit
            .as_ref()
            .map_or(ptr::null_mut(), |s| s.as_ptr() as *mut c_char);
        // SAFETY: the quit script outlives the call.
        unsafe { (self.api.terminate_scilab)(quit_ptr) != 0 }
    }

    fn send_job(&mut self, job: &str) -> i32 {
        let Some(job) = c_string(job) else {
            return INVALID_NAME;
        };
        // SAFETY: the job string outlives the call.
        unsafe { (self.api.send_scilab_job)(job.as_ptr() as *mut c_char) }
    }

    fn create_named_scalar_int32(&mut self, name: &str, value: i32) -> i32 {
        let Some(c_name) = c_string(name) else {
            return INVALID_NAME;
        };
        // SAFETY: named API calls accept a null context.
        unsafe { (self.api.create_named_scalar_integer32)(ptr::null_mut(), c_name.as_ptr(), value) }
    }

    fn create_named_scalar_double(&mut self, name: &str, value: f64) -> i32 {
        let Some(c_name) = c_string(name) else {
            return INVALID_NAME;
        };
        // SAFETY: named API calls accept a null context.
        unsafe { (self.api.create_named_scalar_double)(ptr::null_mut(), c_name.as_ptr(), value) }
    }

    fn create_named_matrix_of_double(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
        column_major: &[f64],
    ) -> SciErr {
        let Some(c_name) = c_string(name) else {
            return invalid_name(name);
        };
        let (Ok(c_rows), Ok(c_cols)) = (c_int::try_from(rows), c_int::try_from(cols)) else {
            return SciErr::new(INVALID_NAME, format!("{name}: {rows}x{cols} is too large"));
        };
        if column_major.len() != rows * cols {
            return SciErr::new(
                INVALID_NAME,
                format!("{name}: {} values for a {rows}x{cols} matrix", column_major.len()),
            );
        }
        // SAFETY: the buffer holds rows * cols doubles and is copied by Scilab.
        let raw = unsafe {
            (self.api.create_named_matrix_of_double)(
                ptr::null_mut(),
                c_name.as_ptr(),
                c_rows,
                c_cols,
                column_major.as_ptr(),
            )
        };
        raw.into_status()
    }

    fn get_named_var_dimension(
        &mut self,
        name: &str,
    ) -> std::result::Result<(usize, usize), SciErr> {
        let c_name = c_string(name).ok_or_else(|| invalid_name(name))?;
        let mut rows: c_int = 0;
        let mut cols: c_int = 0;
        // SAFETY: rows and cols are valid out-pointers for the call.
        let status = unsafe {
            (self.api.get_named_var_dimension)(
                ptr::null_mut(),
                c_name.as_ptr(),
                &mut rows,
                &mut cols,
            )
        }
        .into_status();
        if status.is_err() {
            return Err(status);
        }
        Ok((
            usize::try_from(rows).unwrap_or(0),
            usize::try_from(cols).unwrap_or(0),
        ))
    }

    fn get_named_scalar_int32(&mut self, name: &str) -> std::result::Result<i32, i32> {
        let c_name = c_string(name).ok_or(INVALID_NAME)?;
        let mut value: c_int = 0;
        // SAFETY: value is a valid out-pointer for the call.
        let code = unsafe {
            (self.api.get_named_scalar_integer32)(ptr::null_mut(), c_name.as_ptr(), &mut value)
        };
        if code != 0 {
            return Err(code);
        }
        Ok(value)
    }

    fn get_named_scalar_double(&mut self, name: &str) -> std::result::Result<f64, i32> {
        let c_name = c_string(name).ok_or(INVALID_NAME)?;
        let mut value = 0.0_f64;
        // SAFETY: value is a valid out-pointer for the call.
        let code = unsafe {
            (self.api.get_named_scalar_double)(ptr::null_mut(), c_name.as_ptr(), &mut value)
        };
        if code != 0 {
            return Err(code);
        }
        Ok(value)
    }

    fn read_named_matrix_of_double(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> std::result::Result<Vec<f64>, SciErr> {
        let c_name = c_string(name).ok_or_else(|| invalid_name(name))?;
        let (Ok(mut c_rows), Ok(mut c_cols)) = (c_int::try_from(rows), c_int::try_from(cols)) else {
            return Err(SciErr::new(INVALID_NAME, format!("{name}: {rows}x{cols} is too large")));
        };
        let mut buffer = vec![0.0_f64; rows * cols];
        // SAFETY: buffer holds rows * cols doubles, the dimensions reported for `name`.
        let status = unsafe {
            (self.api.read_named_matrix_of_double)(
                ptr::null_mut(),
                c_name.as_ptr(),
                &mut c_rows,
                &mut c_cols,
                buffer.as_mut_ptr(),
            )
        }
        .into_status();
        if status.is_err() {
            return Err(status);
        }
        Ok(buffer)
    }
}
