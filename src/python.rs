use crate::{AutoPlaceError, ImageAutoPlace, TrailingImages};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyModule;

#[pyfunction]
#[pyo3(signature = (
    html,
    container="body",
    padding=10.0,
    offset=200.0,
    initial_offset=0.0,
    img_selector="img",
    chunk_selector="",
    loop_pattern=None,
    append_trailing=false,
    container_width=600.0
))]
#[allow(clippy::too_many_arguments)]
fn auto_place_html(
    html: &str,
    container: &str,
    padding: f32,
    offset: f32,
    initial_offset: f32,
    img_selector: &str,
    chunk_selector: &str,
    loop_pattern: Option<Vec<String>>,
    append_trailing: bool,
    container_width: f32,
) -> PyResult<String> {
    let mut builder = ImageAutoPlace::builder()
        .padding(padding)
        .offset(offset)
        .initial_offset(initial_offset)
        .img_selector(img_selector)
        .chunk_selector(chunk_selector)
        .container_width(container_width);
    if let Some(names) = loop_pattern {
        builder = builder.loop_pattern_names(names.join(","));
    }
    if append_trailing {
        builder = builder.trailing_images(TrailingImages::Append);
    }
    let engine = builder.build().map_err(to_py_err)?;
    engine.place_html(html, container).map_err(to_py_err)
}

#[pymodule]
fn _autoplace(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_function(wrap_pyfunction!(auto_place_html, module)?)?;
    Ok(())
}

fn to_py_err(err: AutoPlaceError) -> PyErr {
    PyValueError::new_err(err.to_string())
}
