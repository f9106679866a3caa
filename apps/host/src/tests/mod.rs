mod cad;
mod logger;
