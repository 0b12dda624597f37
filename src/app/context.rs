use std::path::Path;

use crate::domain::{MergedConfig, ResolverDefaults, TemplateRenderer, UtdResolver};
use crate::ports::{AssetReader, ShellRunner};

/// Application context holding the I/O dependencies of a composition.
pub struct AppContext<S: ShellRunner, A: AssetReader, T: TemplateRenderer> {
    shell: S,
    assets: A,
    renderer: T,
}

impl<S: ShellRunner, A: AssetReader, T: TemplateRenderer> AppContext<S, A, T> {
    pub fn new(shell: S, assets: A, renderer: T) -> Self {
        Self { shell, assets, renderer }
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn renderer(&self) -> &T {
        &self.renderer
    }

    /// Resolver whose defaults come from the merged settings, running commands in `project_dir`.
    pub fn resolver(&self, config: &MergedConfig, project_dir: &Path) -> UtdResolver<'_> {
        let defaults = ResolverDefaults {
            shell: config.settings.shell.clone(),
            timeout_secs: config.settings.timeout_secs(),
            working_dir: Some(project_dir.to_path_buf()),
        };
        UtdResolver::new(&self.shell, &self.renderer, &self.assets, defaults)
    }
}
