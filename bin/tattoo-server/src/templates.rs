//! Page rendering with minijinja.
//!
//! Templates are compiled into the binary so the server has no runtime
//! dependency on a templates directory.

use minijinja::Environment;

use crate::schemas::tattoo::IndexView;

const INDEX: &str = "index.html";

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX, include_str!("../templates/index.html"))?;
        Ok(Self { env })
    }

    pub fn render_index(&self, view: &IndexView) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX)?.render(view)
    }
}
