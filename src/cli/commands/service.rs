//! Handlers for `rest service ...`.

use crate::cli::ServiceCommands;
use crate::config::alias::AliasUpdate;
use crate::config::location::Location;
use crate::config::manager::ServiceManager;
use crate::error::Error;
use crate::invocation::HttpMethod;
use crate::output::Output;

pub fn execute_service_command(
    manager: &ServiceManager,
    output: &Output,
    command: ServiceCommands,
) -> Result<(), Error> {
    match command {
        ServiceCommands::Init {
            name,
            force,
            settings,
        } => {
            let current = manager.init(&name, &settings.to_settings(), force)?;
            output.success(format!("Service '{name}' initialised."));
            if current {
                output.success(format!("Using service '{name}'."));
            }
        }
        ServiceCommands::Remove { name } => {
            manager.remove(&name)?;
            output.success(format!("Service '{name}' removed."));
        }
        ServiceCommands::Set {
            name,
            path,
            method,
            alias,
            settings,
        } => {
            let location =
                Location::from_parts(&name, path.as_deref(), method.as_deref(), alias.as_deref())?;
            manager.set(&location, &settings.to_settings())?;
            output.success(format!("Settings stored for {location}."));
        }
        ServiceCommands::Unset {
            name,
            path,
            method,
            alias,
            all,
            fields,
        } => {
            let location =
                Location::from_parts(&name, path.as_deref(), method.as_deref(), alias.as_deref())?;
            let removed = manager.unset(&location, &fields.to_selector(), all)?;
            output.success(format!("Removed {removed} stored value(s) from {location}."));
        }
        ServiceCommands::Use { name } => {
            manager.use_service(&name)?;
            output.success(format!("Using service '{name}'."));
        }
        ServiceCommands::List => {
            let services = manager.list()?;
            if services.is_empty() {
                output.success("No services configured.");
            }
            for entry in services {
                let marker = if entry.current { '*' } else { ' ' };
                output.data(format!("{marker} {}", entry.name));
            }
        }
        ServiceCommands::Config { name, key } => {
            for line in manager.config(name.as_deref(), key.as_deref())? {
                output.data(line);
            }
        }
        ServiceCommands::Alias {
            name,
            method,
            path,
            data,
            description,
            service,
            settings,
        } => {
            let update = AliasUpdate {
                name: name.clone(),
                method: method.as_deref().map(str::parse::<HttpMethod>).transpose()?,
                path,
                data,
                description,
                settings: settings.to_settings(),
            };
            let service = manager.add_alias(service.as_deref(), &update)?;
            output.success(format!("Alias '{name}' saved on service '{service}'."));
        }
        ServiceCommands::Aliases { service } => {
            let (service, aliases) = manager.aliases(service.as_deref())?;
            output.success(format!("Aliases of '{service}':"));
            for alias in aliases {
                let line = format!(
                    "{}\t{} {}",
                    alias.name,
                    alias.method.as_str().to_uppercase(),
                    alias.path
                );
                match alias.description {
                    Some(description) => output.data(format!("{line}\t{description}")),
                    None => output.data(line),
                }
            }
        }
    }
    Ok(())
}
